//! Per-tower step generation along a planned trajectory.
//!
//! Where an iterative solver would search for each step with the secant
//! method, delta towers have closed-form crossing times for both straight
//! lines and circular arcs. The stepper only tracks the current step count
//! and the time of the last step, then asks the trajectory when the carriage
//! next reaches the boundary above or below it.

use crate::{
    geometry::{Coord, DeltaGeometry, MotionState, Tower, TowerHeights},
    kinematics::GeometryInfeasible,
    step_time::{StepError, StepEvent, earliest},
};
use core::f64::consts::TAU;

/// Effector motion that can report when a carriage reaches a given height.
pub trait Trajectory {
    /// Effector position `time` seconds into the motion.
    fn position_at(&self, time: f64) -> Coord;

    /// Earliest time strictly after `after` at which `tower`'s carriage is at
    /// height `target`.
    fn crossing_time(
        &self,
        geometry: &DeltaGeometry,
        tower: Tower,
        target: f64,
        after: f64,
    ) -> Result<f64, StepError>;
}

/// Straight-line motion at constant velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMotion {
    state: MotionState,
    heights: TowerHeights,
}

impl LinearMotion {
    /// Carriage heights at the start of the line are cached, so `geometry`
    /// must be the same one later passed to [`Trajectory::crossing_time`].
    pub fn new(geometry: &DeltaGeometry, state: MotionState) -> Result<Self, GeometryInfeasible> {
        let heights = geometry.towers_from_position(state.position)?;
        Ok(Self { state, heights })
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Carriage heights at the start of the line.
    pub fn start_heights(&self) -> &TowerHeights {
        &self.heights
    }
}

impl Trajectory for LinearMotion {
    fn position_at(&self, time: f64) -> Coord {
        self.state.at(time)
    }

    fn crossing_time(
        &self,
        geometry: &DeltaGeometry,
        tower: Tower,
        target: f64,
        after: f64,
    ) -> Result<f64, StepError> {
        geometry.line_crossing(tower, &self.state, self.heights[tower], target, |t| t > after)
    }
}

/// Circular motion at constant angular velocity:
/// `P(t) = c + R cos(wt) u + R sin(wt) v` with `u`, `v` orthonormal.
///
/// Substituting into the rod constraint for a carriage at `T = (tx, ty, D)`
/// and using `u . v = 0` leaves
///
/// ```text
/// p + n cos(wt) + m sin(wt) = 0
/// p = |c - T|^2 + R^2 - L^2,  n = 2R (c - T) . u,  m = 2R (c - T) . v
/// ```
///
/// With `n cos + m sin = rho cos(wt - phi)` this solves to
/// `wt = phi +/- acos(-p / rho)`, repeating every full turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcMotion {
    center: Coord,
    u: Coord,
    v: Coord,
    radius: f64,
    angular_velocity: f64,
}

impl ArcMotion {
    /// Arc about `center` that starts at `start` and turns right-handedly
    /// about `normal` at `angular_velocity` radians per second.
    ///
    /// Returns `None` for a zero radius, a normal parallel to the radius, or
    /// non-finite input.
    pub fn new(center: Coord, start: Coord, normal: Coord, angular_velocity: f64) -> Option<Self> {
        if !(center.is_finite() && start.is_finite() && normal.is_finite())
            || !angular_velocity.is_finite()
        {
            return None;
        }
        let offset = start - center;
        let radius = offset.norm();
        if !(radius > f64::EPSILON) {
            return None;
        }
        let u = offset * radius.recip();
        let v = normal.cross(u);
        let v_norm = v.norm();
        if !(v_norm > f64::EPSILON) {
            return None;
        }
        Some(Self {
            center,
            u,
            v: v * v_norm.recip(),
            radius,
            angular_velocity,
        })
    }

    pub fn center(&self) -> Coord {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    fn point(&self, angle: f64) -> Coord {
        let (sin, cos) = angle.sin_cos();
        self.center + self.u * (self.radius * cos) + self.v * (self.radius * sin)
    }

    // First angle in `angle + k * TAU` strictly past `from` in the direction
    // of travel.
    fn next_turn(&self, angle: f64, from: f64) -> f64 {
        if self.angular_velocity > 0.0 {
            let next = angle + TAU * ((from - angle) / TAU).ceil();
            if next <= from { next + TAU } else { next }
        } else {
            let next = angle + TAU * ((from - angle) / TAU).floor();
            if next >= from { next - TAU } else { next }
        }
    }
}

impl Trajectory for ArcMotion {
    fn position_at(&self, time: f64) -> Coord {
        self.point(self.angular_velocity * time)
    }

    fn crossing_time(
        &self,
        geometry: &DeltaGeometry,
        tower: Tower,
        target: f64,
        after: f64,
    ) -> Result<f64, StepError> {
        let w = self.angular_velocity;
        if w == 0.0 {
            return Err(StepError::WrongDirection);
        }

        let (tx, ty) = geometry.tower_xy(tower);
        let d = self.center - Coord::new(tx, ty, target);
        let p = d.norm_sq() + self.radius * self.radius - geometry.rod_length2();
        let n = 2.0 * self.radius * d.dot(self.u);
        let m = 2.0 * self.radius * d.dot(self.v);
        let rho = n.hypot(m);
        if !(rho > 0.0) || p.abs() > rho {
            return Err(StepError::WrongDirection);
        }

        let phi = m.atan2(n);
        let delta = (-p / rho).clamp(-1.0, 1.0).acos();
        let from = w * after;

        // Each root repeats every turn at the same point, so a root that is
        // not physical at its first occurrence never is.
        [phi + delta, phi - delta]
            .into_iter()
            .map(|angle| self.next_turn(angle, from))
            .filter(|&angle| target - self.point(angle).z >= 0.0)
            .map(|angle| angle / w)
            .min_by(f64::total_cmp)
            .ok_or(StepError::WrongDirection)
    }
}

/// Iterator over the steps of one tower while following a trajectory.
///
/// Step `k` puts the carriage at height `k * step_distance`. Each call tests
/// the boundaries one step above and below the current count and takes the
/// sooner one, since a carriage can reverse mid-move even when the effector
/// does not.
pub struct AxisStepper<'g, M> {
    geometry: &'g DeltaGeometry,
    tower: Tower,
    motion: M,
    step_distance: f64,
    steps: i64,
    time: f64,
    end_time: f64,
}

impl<'g, M: Trajectory> AxisStepper<'g, M> {
    pub fn new(
        geometry: &'g DeltaGeometry,
        tower: Tower,
        motion: M,
        step_distance: f64,
        start_steps: i64,
        end_time: f64,
    ) -> Self {
        Self {
            geometry,
            tower,
            motion,
            step_distance,
            steps: start_steps,
            time: 0.0,
            end_time,
        }
    }

    /// Current carriage position in steps.
    pub fn steps(&self) -> i64 {
        self.steps
    }

    /// Time of the most recent step.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tower(&self) -> Tower {
        self.tower
    }

    pub fn motion(&self) -> &M {
        &self.motion
    }

    fn crossing(&self, steps: i64) -> Option<f64> {
        let target = steps as f64 * self.step_distance;
        self.motion
            .crossing_time(self.geometry, self.tower, target, self.time)
            .ok()
            .filter(|&t| t <= self.end_time)
    }

    pub fn next_step(&mut self) -> Option<StepEvent> {
        let forward = self.crossing(self.steps + 1);
        let backward = self.crossing(self.steps - 1);
        let event = earliest(forward, backward)?;
        tracing::trace!(
            tower = %self.tower,
            time = event.time,
            direction = %event.direction,
            steps = self.steps,
            "step"
        );
        self.time = event.time;
        self.steps += event.direction.sign();
        Some(event)
    }
}

impl<M: Trajectory> Iterator for AxisStepper<'_, M> {
    type Item = StepEvent;

    fn next(&mut self) -> Option<StepEvent> {
        self.next_step()
    }
}
