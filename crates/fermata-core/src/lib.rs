//! Kinematics and step timing for linear delta robots.
//!
//! Everything here is a closed-form function of an immutable
//! [`DeltaGeometry`]; nothing allocates on the per-step path and nothing
//! performs I/O.

pub mod geometry;
pub mod kinematics;
pub mod machine;
pub mod step_time;
pub mod stepper;
pub mod verify;

pub use geometry::{Coord, DeltaGeometry, GeometryError, MotionState, Tower, TowerHeights, TowerSet};
pub use kinematics::{Candidates, Configuration, GeometryInfeasible};
pub use machine::DeltaMachine;
pub use step_time::{StepDirection, StepError, StepEvent};
pub use stepper::{ArcMotion, AxisStepper, LinearMotion, Trajectory};
pub use verify::{Report, VerificationHarness, VerifyOptions};
