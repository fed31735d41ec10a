// Inverse kinematics - carriage heights to effector position
//
// Subtracting the tower A rod equation from the B and C equations leaves two
// linear equations, so x and y are affine in the rod drop `w = A - z`:
//
//   x = x0 + x1 w        y = y0 + y1 w
//
// Substituting both back into the tower A equation leaves one quadratic in
// `w`. Working in `w` keeps every coefficient a function of the height
// differences `B - A` and `C - A` only. The two roots mirror each other
// across the plane through the three carriage joints; the physical one has
// every rod hanging down from its carriage.

use super::GeometryInfeasible;
use crate::geometry::{Coord, DeltaGeometry, TowerHeights};
use core::ops::Deref;

/// Heights closer than this (in machine length units) are treated as equal
/// when routing to the degenerate branches.
pub const DEGENERATE_TOLERANCE: f64 = 1e-9;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Which closed form solves a given height triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    /// `A = B = C`: the effector sits on the center axis.
    Symmetric,
    /// `B = C`: the effector lies in the plane through tower A and the center.
    Bisecting,
    /// Pairwise distinct heights.
    General,
}

impl Configuration {
    pub fn classify(h: &TowerHeights) -> Self {
        let bc = (h.b - h.c).abs() <= DEGENERATE_TOLERANCE;
        if bc && (h.a - h.b).abs() <= DEGENERATE_TOLERANCE {
            Configuration::Symmetric
        } else if bc {
            Configuration::Bisecting
        } else {
            Configuration::General
        }
    }
}

/// Up to two effector positions for one height triple, lowest first.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Candidates {
    points: [Coord; 2],
    len: usize,
}

impl Candidates {
    pub const fn new() -> Self {
        Self {
            points: [Coord::ZERO; 2],
            len: 0,
        }
    }

    fn push(&mut self, p: Coord) {
        if self.len < self.points.len() {
            self.points[self.len] = p;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[Coord] {
        &self.points[..self.len]
    }

    /// Whether any candidate lies within `tolerance` of `p` on every axis.
    pub fn contains_near(&self, p: Coord, tolerance: f64) -> bool {
        self.iter().any(|c| c.max_abs_diff(p) <= tolerance)
    }
}

impl Deref for Candidates {
    type Target = [Coord];

    fn deref(&self) -> &[Coord] {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a Candidates {
    type Item = &'a Coord;
    type IntoIter = core::slice::Iter<'a, Coord>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

/// `a w^2 + 2 b w + c = 0` with `x = x0 + x1 w`, `y = y0 + y1 w`.
#[derive(Debug, Clone, Copy)]
struct RodQuadratic {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    a: f64,
    b: f64,
    c: f64,
}

impl RodQuadratic {
    fn new(geometry: &DeltaGeometry, x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        // tower A rod: w^2 + x^2 + (y - r)^2 = L^2
        let ey0 = y0 - geometry.radius();
        Self {
            x0,
            x1,
            y0,
            y1,
            a: 1.0 + x1 * x1 + y1 * y1,
            b: x0 * x1 + ey0 * y1,
            c: x0 * x0 + ey0 * ey0 - geometry.rod_length2(),
        }
    }

    fn general(geometry: &DeltaGeometry, h: &TowerHeights) -> Self {
        let r = geometry.radius();
        let db = h.b - h.a;
        let dc = h.c - h.a;
        let x1 = (db - dc) / (SQRT_3 * r);
        let y1 = -(db + dc) / (3.0 * r);
        Self::new(
            geometry,
            0.5 * x1 * (db + dc),
            x1,
            -(db * db + dc * dc) / (6.0 * r),
            y1,
        )
    }

    // Only A and B enter: x vanishes and (y, w) solve the reduced system.
    fn bisecting(geometry: &DeltaGeometry, h: &TowerHeights) -> Self {
        let r = geometry.radius();
        let d = h.b - h.a;
        Self::new(geometry, 0.0, 0.0, -d * d / (3.0 * r), -2.0 * d / (3.0 * r))
    }

    /// Midpoint and half-spread of the two roots, or `None` if they are complex.
    fn roots(&self) -> Option<(f64, f64)> {
        let disc = self.b * self.b - self.a * self.c;
        if !(disc >= 0.0) {
            return None;
        }
        Some((-self.b / self.a, disc.sqrt() / self.a))
    }

    fn point(&self, h: &TowerHeights, w: f64) -> Coord {
        Coord::new(self.x0 + self.x1 * w, self.y0 + self.y1 * w, h.a - w)
    }
}

fn is_physical(p: &Coord, h: &TowerHeights) -> bool {
    p.z < h.a && p.z < h.b && p.z < h.c
}

impl DeltaGeometry {
    fn rod_quadratic(&self, h: &TowerHeights, configuration: Configuration) -> RodQuadratic {
        match configuration {
            Configuration::Bisecting => RodQuadratic::bisecting(self, h),
            _ => RodQuadratic::general(self, h),
        }
    }

    fn center_position(&self, h: &TowerHeights) -> Coord {
        Coord::new(0.0, 0.0, h.a - self.center_drop())
    }

    /// Every physically valid effector position for the given heights.
    ///
    /// Both algebraic roots are tested against the same rule: the effector
    /// must sit strictly below all three carriages. An empty result means the
    /// triple is infeasible.
    pub fn positions_from_towers(&self, h: &TowerHeights) -> Candidates {
        let mut candidates = Candidates::new();
        if !h.is_finite() {
            return candidates;
        }

        let configuration = Configuration::classify(h);
        tracing::trace!(?configuration, %h, "inverse kinematics");

        if configuration == Configuration::Symmetric {
            let p = self.center_position(h);
            if is_physical(&p, h) {
                candidates.push(p);
            }
            return candidates;
        }

        let quadratic = self.rod_quadratic(h, configuration);
        let Some((mid, spread)) = quadratic.roots() else {
            return candidates;
        };

        // larger drop first, so the lower effector leads
        let mut push = |w: f64| {
            let p = quadratic.point(h, w);
            if is_physical(&p, h) {
                candidates.push(p);
            }
        };
        push(mid + spread);
        if spread > 0.0 {
            push(mid - spread);
        }
        candidates
    }

    /// The physical effector position for the given heights.
    ///
    /// Takes the lower root directly as `candidate - |deviation|` rather
    /// than producing both roots and filtering.
    pub fn position_from_towers(&self, h: &TowerHeights) -> Result<Coord, GeometryInfeasible> {
        if !h.is_finite() {
            return Err(GeometryInfeasible::NoSolution);
        }

        let configuration = Configuration::classify(h);
        tracing::trace!(?configuration, %h, "inverse kinematics");

        let p = if configuration == Configuration::Symmetric {
            self.center_position(h)
        } else {
            let quadratic = self.rod_quadratic(h, configuration);
            let (mid, spread) = quadratic.roots().ok_or(GeometryInfeasible::NoSolution)?;
            quadratic.point(h, mid + spread.abs())
        };

        if is_physical(&p, h) {
            Ok(p)
        } else {
            Err(GeometryInfeasible::NoSolution)
        }
    }
}
