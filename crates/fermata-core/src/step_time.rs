//! Closed-form step timing for constant-velocity motion.
//!
//! For the effector moving along `P(t) = P0 + v t`, a tower's carriage is at
//! height `D` when `|P(t) - T|^2 = L^2` with `T = (tx, ty, D)`. Expanding
//! gives one quadratic per tower,
//!
//! ```text
//! |v|^2 t^2 - 2 b t + c = 0
//! b = v . (T - P0)
//! c = |P0 - T|^2 - L^2 = (D - H0)(D + H0 - 2 z0)
//! ```
//!
//! where `H0` is the carriage height at `P0`. The factored form of `c` is
//! exact at `D = H0` and avoids cancelling two squared rod lengths. Only the
//! tower position `(tx, ty)` depends on the axis.

use crate::{
    geometry::{DeltaGeometry, MotionState, Tower},
    kinematics::GeometryInfeasible,
};
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Squared speeds below this are treated as standing still.
const MIN_SPEED_SQ: f64 = 1e-18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepError {
    /// The carriage never reaches the target height at or after the
    /// requested time; try the other direction.
    #[error("carriage never reaches the target height along the current motion")]
    WrongDirection,
    #[error(transparent)]
    Geometry(#[from] GeometryInfeasible),
}

/// Direction of a single carriage step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    /// Carriage moves up.
    Forward,
    /// Carriage moves down.
    Backward,
}

impl StepDirection {
    pub fn sign(self) -> i64 {
        match self {
            StepDirection::Forward => 1,
            StepDirection::Backward => -1,
        }
    }
}

impl fmt::Display for StepDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepDirection::Forward => f.write_str("forward"),
            StepDirection::Backward => f.write_str("backward"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub time: f64,
    pub direction: StepDirection,
}

/// Pick the sooner of the two candidate steps. Ties go forward.
pub(crate) fn earliest(forward: Option<f64>, backward: Option<f64>) -> Option<StepEvent> {
    let event = |time, direction| StepEvent { time, direction };
    match (forward, backward) {
        (Some(f), Some(b)) if b < f => Some(event(b, StepDirection::Backward)),
        (Some(f), _) => Some(event(f, StepDirection::Forward)),
        (None, Some(b)) => Some(event(b, StepDirection::Backward)),
        (None, None) => None,
    }
}

impl DeltaGeometry {
    /// Earliest admissible time at which `tower`'s carriage is at `target`,
    /// for motion starting at `state` where the carriage is at `height`.
    pub(crate) fn line_crossing(
        &self,
        tower: Tower,
        state: &MotionState,
        height: f64,
        target: f64,
        admits: impl Fn(f64) -> bool,
    ) -> Result<f64, StepError> {
        let p = state.position;
        let v = state.velocity;
        let v2 = v.norm_sq();
        if !(v2 > MIN_SPEED_SQ) {
            return Err(StepError::WrongDirection);
        }

        let (tx, ty) = self.tower_xy(tower);
        let s = target - height;
        let b = v.x * (tx - p.x) + v.y * (ty - p.y) + v.z * (target - p.z);
        let c = s * (s + 2.0 * (height - p.z));
        let disc = b * b - v2 * c;
        if !(disc >= 0.0) {
            return Err(StepError::WrongDirection);
        }

        let q = b + disc.sqrt().copysign(b);
        let (t1, t2) = if q == 0.0 {
            (0.0, 0.0)
        } else {
            let (r1, r2) = (q / v2, c / q);
            (r1.min(r2), r1.max(r2))
        };

        // Roots in the past, or with the effector above the carriage, belong
        // to the squared equation only.
        [t1, t2]
            .into_iter()
            .find(|&t| admits(t) && target - (p.z + v.z * t) >= 0.0)
            .ok_or(StepError::WrongDirection)
    }

    /// Time until `tower`'s carriage has moved `offset` from its current
    /// height, for the effector moving at constant velocity from `state`.
    ///
    /// Returns the soonest non-negative crossing. A crossing that only exists
    /// in the past, or not at all, is [`StepError::WrongDirection`].
    pub fn time_to_reach(
        &self,
        tower: Tower,
        offset: f64,
        state: &MotionState,
    ) -> Result<f64, StepError> {
        let height = self.tower_height(tower, state.position)?;
        self.line_crossing(tower, state, height, height + offset, |t| t >= 0.0)
    }

    /// The sooner of one step up or one step down for `tower`.
    ///
    /// `Ok(None)` means neither step is ever reached from the current motion,
    /// including when the effector is not moving.
    pub fn time_and_direction_to_reach(
        &self,
        tower: Tower,
        step_distance: f64,
        state: &MotionState,
    ) -> Result<Option<StepEvent>, GeometryInfeasible> {
        let height = self.tower_height(tower, state.position)?;
        let step = step_distance.abs();
        let forward = self.line_crossing(tower, state, height, height + step, |t| t >= 0.0);
        let backward = self.line_crossing(tower, state, height, height - step, |t| t >= 0.0);
        let event = earliest(forward.ok(), backward.ok());
        tracing::trace!(%tower, ?forward, ?backward, ?event, "next step");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;
    use approx::assert_relative_eq;

    fn geometry() -> DeltaGeometry {
        DeltaGeometry::new(100.0, 260.0).unwrap()
    }

    fn state(position: (f64, f64, f64), velocity: (f64, f64, f64)) -> MotionState {
        MotionState::new(
            Coord::new(position.0, position.1, position.2),
            Coord::new(velocity.0, velocity.1, velocity.2),
        )
    }

    // Along +x from the center, tower A drops as sqrt(H0^2 - t^2), H0 = 240.
    fn center_time(s: f64) -> f64 {
        (240.0f64.powi(2) - (240.0 + s).powi(2)).sqrt()
    }

    #[test]
    fn moving_away_from_tower_a_lowers_it() {
        let geometry = geometry();
        let moving = state((0.0, 0.0, 0.0), (1.0, 0.0, 0.0));
        for s in [-1.0, -2.0, -3.0] {
            let t = geometry.time_to_reach(Tower::A, s, &moving).unwrap();
            assert_relative_eq!(t, center_time(s), max_relative = 1e-12);
        }
        for s in [1.0, 3.0] {
            assert_eq!(
                geometry.time_to_reach(Tower::A, s, &moving),
                Err(StepError::WrongDirection)
            );
        }
        assert_relative_eq!(center_time(-1.0), 479.0f64.sqrt());
    }

    #[test]
    fn symmetric_in_x() {
        let geometry = geometry();
        let moving = state((0.0, 0.0, 0.0), (-1.0, 0.0, 0.0));
        for s in [-2.0, -3.0] {
            let t = geometry.time_to_reach(Tower::A, s, &moving).unwrap();
            assert_relative_eq!(t, center_time(s), max_relative = 1e-12);
        }
    }

    #[test]
    fn reached_height_matches_forward_kinematics() {
        let geometry = geometry();
        let moving = state((10.0, 20.0, 5.0), (3.0, -2.0, 1.0));
        for tower in Tower::ALL {
            let h0 = geometry.tower_height(tower, moving.position).unwrap();
            for s in [0.01, -0.01, 0.5] {
                let Ok(t) = geometry.time_to_reach(tower, s, &moving) else {
                    continue;
                };
                assert!(t >= 0.0);
                let h = geometry.tower_height(tower, moving.at(t)).unwrap();
                assert_relative_eq!(h - h0, s, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn late_turnaround_is_found() {
        // Tower B first rises along this line, then falls far later.
        let geometry = geometry();
        let moving = state((10.0, 20.0, 5.0), (3.0, -2.0, 1.0));
        let up = geometry.time_to_reach(Tower::B, 0.01, &moving).unwrap();
        let down = geometry.time_to_reach(Tower::B, -0.01, &moving).unwrap();
        assert!(up < 0.01);
        assert!(down > 50.0);
    }

    #[test]
    fn vertical_motion() {
        let geometry = geometry();
        let up = state((10.0, 20.0, 5.0), (0.0, 0.0, 2.0));
        let t = geometry.time_to_reach(Tower::C, 0.01, &up).unwrap();
        assert_relative_eq!(t, 0.005, max_relative = 1e-9);

        let down = state((10.0, 20.0, 5.0), (0.0, 0.0, -1.0));
        assert_eq!(
            geometry.time_to_reach(Tower::C, 0.01, &down),
            Err(StepError::WrongDirection)
        );
    }

    #[test]
    fn zero_offset_is_immediate() {
        let geometry = geometry();
        let moving = state((5.0, 5.0, 0.0), (1.0, 1.0, 0.0));
        assert_eq!(geometry.time_to_reach(Tower::B, 0.0, &moving), Ok(0.0));
    }

    #[test]
    fn stationary_never_crosses() {
        let geometry = geometry();
        let still = state((10.0, 20.0, 5.0), (0.0, 0.0, 0.0));
        assert_eq!(
            geometry.time_to_reach(Tower::A, 0.01, &still),
            Err(StepError::WrongDirection)
        );
        assert_eq!(
            geometry.time_and_direction_to_reach(Tower::A, 0.01, &still),
            Ok(None)
        );
    }

    #[test]
    fn unreachable_start_is_a_geometry_error() {
        let geometry = geometry();
        let lost = state((500.0, 0.0, 0.0), (1.0, 0.0, 0.0));
        assert!(matches!(
            geometry.time_to_reach(Tower::A, 0.01, &lost),
            Err(StepError::Geometry(GeometryInfeasible::OutOfReach(_)))
        ));
        assert!(
            geometry
                .time_and_direction_to_reach(Tower::A, 0.01, &lost)
                .is_err()
        );
    }

    #[test]
    fn direction_from_center() {
        let geometry = geometry();
        let moving = state((0.0, 0.0, 0.0), (1.0, 0.0, 0.0));
        let event = geometry
            .time_and_direction_to_reach(Tower::A, 1.0, &moving)
            .unwrap()
            .unwrap();
        assert_eq!(event.direction, StepDirection::Backward);
        assert_relative_eq!(event.time, 479.0f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn direction_toward_tower() {
        let geometry = geometry();
        // heading straight for tower A from below the center
        let moving = state((0.0, -50.0, 0.0), (0.0, 1.0, 0.0));
        let event = geometry
            .time_and_direction_to_reach(Tower::A, 0.0125, &moving)
            .unwrap()
            .unwrap();
        assert_eq!(event.direction, StepDirection::Forward);
        assert!(event.time > 0.0);
    }

    #[test]
    fn earliest_prefers_sooner() {
        assert_eq!(earliest(None, None), None);
        assert_eq!(
            earliest(Some(2.0), Some(1.0)).map(|e| e.direction),
            Some(StepDirection::Backward)
        );
        assert_eq!(
            earliest(Some(1.0), Some(1.0)).map(|e| e.direction),
            Some(StepDirection::Forward)
        );
        assert_eq!(
            earliest(None, Some(3.0)),
            Some(StepEvent {
                time: 3.0,
                direction: StepDirection::Backward
            })
        );
    }

    #[test]
    fn error_message() {
        insta::assert_snapshot!(
            StepError::WrongDirection.to_string(),
            @"carriage never reaches the target height along the current motion"
        );
    }
}
