// Linear delta kinematics
//
// Forward maps an effector position to carriage heights, inverse maps the
// heights back to candidate effector positions.

use crate::geometry::TowerSet;
use thiserror::Error;

pub mod forward;
pub mod inverse;

pub use inverse::{Candidates, Configuration};

/// A position or carriage-height triple that the machine cannot realize.
///
/// This is a routine outcome (a planner probing the edge of the envelope)
/// and is always returned as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryInfeasible {
    #[error("effector is out of reach of tower(s) {0}")]
    OutOfReach(TowerSet),
    #[error("no effector position reproduces the requested tower heights")]
    NoSolution,
}
