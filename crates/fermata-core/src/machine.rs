//! Mechanical envelope of a linear delta: tower height, build plate and
//! stepper resolution on top of the rod geometry.

use crate::{
    geometry::{Coord, DeltaGeometry, GeometryError, MotionState, Tower, TowerHeights, check_length},
    kinematics::GeometryInfeasible,
    stepper::{ArcMotion, AxisStepper, LinearMotion, Trajectory},
};

/// Default lowest z the effector may be sent to. Slightly below the bed so
/// the nozzle height can be tuned.
pub const DEFAULT_MIN_Z: f64 = -2.0;

/// Carriage positions of the three towers, in whole steps.
pub type TowerSteps = [i64; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaMachine {
    geometry: DeltaGeometry,
    tower_height: f64,
    build_radius: f64,
    steps_per_mm: f64,
    min_z: f64,
}

impl DeltaMachine {
    pub fn new(
        geometry: DeltaGeometry,
        tower_height: f64,
        build_radius: f64,
        steps_per_mm: f64,
    ) -> Result<Self, GeometryError> {
        Self::with_min_z(geometry, tower_height, build_radius, steps_per_mm, DEFAULT_MIN_Z)
    }

    pub fn with_min_z(
        geometry: DeltaGeometry,
        tower_height: f64,
        build_radius: f64,
        steps_per_mm: f64,
        min_z: f64,
    ) -> Result<Self, GeometryError> {
        check_length("tower_height", tower_height)?;
        check_length("build_radius", build_radius)?;
        check_length("steps_per_mm", steps_per_mm)?;
        let machine = Self {
            geometry,
            tower_height,
            build_radius,
            steps_per_mm,
            min_z,
        };
        let max_z = machine.max_z();
        if !(max_z > min_z) {
            return Err(GeometryError::EmptyEnvelope { max_z, min_z });
        }
        Ok(machine)
    }

    pub fn geometry(&self) -> &DeltaGeometry {
        &self.geometry
    }

    /// Carriage height at the top of each tower (the homing position).
    pub fn tower_height(&self) -> f64 {
        self.tower_height
    }

    pub fn build_radius(&self) -> f64 {
        self.build_radius
    }

    pub fn steps_per_mm(&self) -> f64 {
        self.steps_per_mm
    }

    pub fn min_z(&self) -> f64 {
        self.min_z
    }

    /// Carriage travel of a single step, in mm.
    pub fn step_distance(&self) -> f64 {
        self.steps_per_mm.recip()
    }

    /// Effector height with every carriage homed.
    pub fn max_z(&self) -> f64 {
        self.tower_height - self.geometry.center_drop()
    }

    /// Effector position with every carriage homed.
    pub fn home_position(&self) -> Coord {
        Coord::new(0.0, 0.0, self.max_z())
    }

    /// Step counts with every carriage at the top of its tower.
    pub fn home_steps(&self) -> TowerSteps {
        self.steps_from_heights(&TowerHeights::level(self.tower_height))
    }

    pub fn heights_from_steps(&self, steps: TowerSteps) -> TowerHeights {
        let mm = |s: i64| s as f64 / self.steps_per_mm;
        TowerHeights::new(mm(steps[0]), mm(steps[1]), mm(steps[2]))
    }

    /// Nearest whole step for each carriage.
    pub fn steps_from_heights(&self, heights: &TowerHeights) -> TowerSteps {
        Tower::ALL.map(|tower| (heights[tower] * self.steps_per_mm).round() as i64)
    }

    /// Effector position for mechanical carriage positions.
    pub fn position_from_steps(&self, steps: TowerSteps) -> Result<Coord, GeometryInfeasible> {
        self.geometry
            .position_from_towers(&self.heights_from_steps(steps))
    }

    /// Pull a requested position into the printable volume.
    ///
    /// `z` is clamped to `[min_z, max_z]`. A point outside the build plate is
    /// scaled toward the center axis until it lies on the plate's edge.
    pub fn bound(&self, p: Coord) -> Coord {
        let z = p.z.clamp(self.min_z, self.max_z());
        let r2 = p.x * p.x + p.y * p.y;
        let limit2 = self.build_radius * self.build_radius;
        if r2 > limit2 {
            let ratio = (limit2 / r2).sqrt();
            Coord::new(p.x * ratio, p.y * ratio, z)
        } else {
            Coord::new(p.x, p.y, z)
        }
    }

    /// Steps of `tower` along a straight line lasting `duration` seconds.
    pub fn line_stepper(
        &self,
        tower: Tower,
        state: MotionState,
        duration: f64,
    ) -> Result<AxisStepper<'_, LinearMotion>, GeometryInfeasible> {
        let motion = LinearMotion::new(&self.geometry, state)?;
        let start = self.steps_from_heights(motion.start_heights())[tower.index()];
        Ok(AxisStepper::new(
            &self.geometry,
            tower,
            motion,
            self.step_distance(),
            start,
            duration,
        ))
    }

    /// Steps of `tower` along an arc lasting `duration` seconds.
    pub fn arc_stepper(
        &self,
        tower: Tower,
        arc: ArcMotion,
        duration: f64,
    ) -> Result<AxisStepper<'_, ArcMotion>, GeometryInfeasible> {
        let height = self.geometry.tower_height(tower, arc.position_at(0.0))?;
        let start = (height * self.steps_per_mm).round() as i64;
        Ok(AxisStepper::new(
            &self.geometry,
            tower,
            arc,
            self.step_distance(),
            start,
            duration,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step_time::StepDirection;
    use approx::assert_relative_eq;

    fn machine() -> DeltaMachine {
        let geometry = DeltaGeometry::new(100.0, 260.0).unwrap();
        DeltaMachine::new(geometry, 800.0, 85.0, 80.0).unwrap()
    }

    #[test]
    fn rejects_bad_envelope() {
        let geometry = DeltaGeometry::new(100.0, 260.0).unwrap();
        assert!(matches!(
            DeltaMachine::new(geometry, 800.0, 85.0, 0.0),
            Err(GeometryError::NonPositive {
                name: "steps_per_mm",
                ..
            })
        ));
        // carriages cannot lift the effector off the bed
        assert!(matches!(
            DeltaMachine::new(geometry, 200.0, 85.0, 80.0),
            Err(GeometryError::EmptyEnvelope { .. })
        ));
        assert!(DeltaMachine::with_min_z(geometry, 800.0, 85.0, 80.0, f64::NAN).is_err());
    }

    #[test]
    fn homing() {
        let machine = machine();
        assert_eq!(machine.home_steps(), [64_000; 3]);
        assert_eq!(machine.max_z(), 560.0);
        assert_eq!(
            machine.position_from_steps(machine.home_steps()),
            Ok(machine.home_position())
        );
    }

    #[test]
    fn steps_and_heights_convert() {
        let machine = machine();
        let heights = machine.heights_from_steps([8000, 8001, 7999]);
        assert_eq!(heights, TowerHeights::new(100.0, 100.0125, 99.9875));
        assert_eq!(machine.steps_from_heights(&heights), [8000, 8001, 7999]);
        assert_eq!(machine.step_distance(), 0.0125);
    }

    #[test]
    fn position_from_steps_matches_forward_kinematics() {
        let machine = machine();
        let target = Coord::new(12.0, -30.0, 40.0);
        let heights = machine.geometry().towers_from_position(target).unwrap();
        let steps = machine.steps_from_heights(&heights);
        let p = machine.position_from_steps(steps).unwrap();
        // quantized to a step in each carriage
        assert!(p.max_abs_diff(target) < 0.05);
    }

    #[test]
    fn bound_clamps_height() {
        let machine = machine();
        assert_eq!(machine.bound(Coord::new(0.0, 0.0, -10.0)).z, -2.0);
        assert_eq!(machine.bound(Coord::new(0.0, 0.0, 900.0)).z, 560.0);
        assert_eq!(
            machine.bound(Coord::new(1.0, 2.0, 3.0)),
            Coord::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn bound_pulls_onto_plate() {
        let machine = machine();
        let p = machine.bound(Coord::new(170.0, 0.0, 5.0));
        assert_relative_eq!(p.x, 85.0, epsilon = 1e-12);
        assert_eq!(p.y, 0.0);

        let p = machine.bound(Coord::new(-90.0, 120.0, 5.0));
        assert_relative_eq!(p.x.hypot(p.y), 85.0, epsilon = 1e-9);
        assert_relative_eq!(p.y / p.x, 120.0 / -90.0, epsilon = 1e-12);
    }

    #[test]
    fn line_stepper_starts_at_current_height() {
        let machine = machine();
        let state = MotionState::new(Coord::ZERO, Coord::new(1.0, 0.0, 0.0));
        let mut stepper = machine.line_stepper(Tower::A, state, 10.0).unwrap();
        assert_eq!(stepper.steps(), 240 * 80);
        let first = stepper.next_step().unwrap();
        assert_eq!(first.direction, StepDirection::Backward);
        assert_relative_eq!(
            first.time,
            (240.0f64.powi(2) - (240.0 - 0.0125f64).powi(2)).sqrt(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn arc_stepper_rejects_unreachable_start() {
        let machine = machine();
        let arc = ArcMotion::new(
            Coord::new(300.0, 0.0, 0.0),
            Coord::new(310.0, 0.0, 0.0),
            Coord::new(0.0, 0.0, 1.0),
            1.0,
        )
        .unwrap();
        assert!(machine.arc_stepper(Tower::C, arc, 1.0).is_err());
    }
}
