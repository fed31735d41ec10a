use super::{CommonArgs, parse_coord, parse_tower};
use anyhow::Result;
use clap::Args;
use fermata_core::{Coord, MotionState, StepDirection, StepError, Tower};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct StepArgs {
    /// Tower to solve for (a, b or c).
    #[arg(long, value_parser = parse_tower)]
    pub tower: Tower,

    /// Effector position as x,y,z in mm.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    pub position: Coord,

    /// Effector velocity as x,y,z in mm/s.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    pub velocity: Coord,

    /// Carriage offset to reach, in mm.
    ///
    /// Without an offset, reports which of the next step up or down comes
    /// first, using the configured steps per mm.
    #[arg(long, allow_negative_numbers = true)]
    pub offset: Option<f64>,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum StepOutput {
    Reached { time: f64 },
    WrongDirection,
    Step { time: f64, direction: StepDirection },
    NoCrossing,
}

impl fmt::Display for StepOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutput::Reached { time } => write!(f, "reached after {time:.9} s"),
            StepOutput::WrongDirection => f.write_str("never reached: wrong direction"),
            StepOutput::Step { time, direction } => {
                write!(f, "{direction} step after {time:.9} s")
            }
            StepOutput::NoCrossing => f.write_str("no step in either direction"),
        }
    }
}

impl StepArgs {
    pub fn run(&self, common: &CommonArgs) -> Result<()> {
        let config = common.load()?;
        let machine = config.machine()?;
        let geometry = machine.geometry();
        let state = MotionState::new(self.position, self.velocity);

        let output = match self.offset {
            Some(offset) => match geometry.time_to_reach(self.tower, offset, &state) {
                Ok(time) => StepOutput::Reached { time },
                Err(StepError::WrongDirection) => StepOutput::WrongDirection,
                Err(err) => return Err(err.into()),
            },
            None => {
                match geometry.time_and_direction_to_reach(
                    self.tower,
                    machine.step_distance(),
                    &state,
                )? {
                    Some(event) => StepOutput::Step {
                        time: event.time,
                        direction: event.direction,
                    },
                    None => StepOutput::NoCrossing,
                }
            }
        };

        common.print(&output, || output.to_string())
    }
}
