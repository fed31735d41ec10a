use super::{CommonArgs, parse_coord, parse_tower};
use anyhow::{Context, Result};
use clap::Args;
use fermata_core::{Coord, MotionState, StepDirection, Tower};
use serde::Serialize;

#[derive(Args)]
pub struct TraceArgs {
    /// Only trace this tower (a, b or c). Traces all three by default.
    #[arg(long, value_parser = parse_tower)]
    pub tower: Option<Tower>,

    /// Start position as x,y,z in mm.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    pub position: Coord,

    /// Constant velocity as x,y,z in mm/s.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    pub velocity: Coord,

    /// Length of the move, in seconds.
    #[arg(long)]
    pub duration: f64,
}

#[derive(Debug, Serialize)]
struct TracedStep {
    time: f64,
    tower: Tower,
    direction: StepDirection,
    /// Carriage position after the step.
    steps: i64,
}

impl TraceArgs {
    pub fn run(&self, common: &CommonArgs) -> Result<()> {
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            anyhow::bail!("duration must be a non-negative number of seconds");
        }

        let config = common.load()?;
        let machine = config.machine()?;
        let state = MotionState::new(self.position, self.velocity);
        let towers = match self.tower {
            Some(tower) => vec![tower],
            None => Tower::ALL.to_vec(),
        };

        let mut steps = Vec::new();
        for tower in towers {
            let mut stepper = machine
                .line_stepper(tower, state, self.duration)
                .with_context(|| format!("cannot start a move at {}", self.position))?;
            while let Some(event) = stepper.next_step() {
                steps.push(TracedStep {
                    time: event.time,
                    tower,
                    direction: event.direction,
                    steps: stepper.steps(),
                });
            }
        }
        steps.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(a.tower.index().cmp(&b.tower.index()))
        });
        tracing::info!(count = steps.len(), "traced line");

        common.print(&steps, || {
            steps
                .iter()
                .map(|s| format!("{:.9} {} {:<8} {}", s.time, s.tower, s.direction, s.steps))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}
