// Forward kinematics - effector position to carriage heights

use super::GeometryInfeasible;
use crate::geometry::{Coord, DeltaGeometry, Tower, TowerHeights, TowerSet};

impl DeltaGeometry {
    /// Squared vertical rod projection for `tower` with the effector at `p`.
    ///
    /// Negative when the rod cannot reach `(p.x, p.y)` at all.
    pub fn rod_radicand(&self, tower: Tower, p: Coord) -> f64 {
        let (tx, ty) = self.tower_xy(tower);
        let dx = tx - p.x;
        let dy = ty - p.y;
        self.rod_length2() - dx * dx - dy * dy
    }

    /// Carriage height of a single tower for the effector at `p`.
    pub fn tower_height(&self, tower: Tower, p: Coord) -> Result<f64, GeometryInfeasible> {
        let radicand = self.rod_radicand(tower, p);
        // also rejects NaN coordinates
        if !(radicand >= 0.0) || !p.z.is_finite() {
            return Err(GeometryInfeasible::OutOfReach(TowerSet::new().with(tower)));
        }
        Ok(p.z + radicand.sqrt())
    }

    /// Carriage heights of all three towers for the effector at `p`.
    ///
    /// Every tower is evaluated; the error names each tower whose rod falls
    /// short, not just the first.
    pub fn towers_from_position(&self, p: Coord) -> Result<TowerHeights, GeometryInfeasible> {
        let mut heights = TowerHeights::default();
        let mut unreachable = TowerSet::new();
        for tower in Tower::ALL {
            match self.tower_height(tower, p) {
                Ok(h) => heights[tower] = h,
                Err(_) => unreachable = unreachable.with(tower),
            }
        }
        if unreachable.is_empty() {
            Ok(heights)
        } else {
            Err(GeometryInfeasible::OutOfReach(unreachable))
        }
    }
}
