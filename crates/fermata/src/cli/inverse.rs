use super::CommonArgs;
use anyhow::{Context, Result};
use clap::Args;
use fermata_core::{Configuration, Coord, TowerHeights};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Args)]
pub struct InverseArgs {
    /// Carriage height of tower A, in mm.
    #[arg(allow_negative_numbers = true)]
    pub a: f64,
    /// Carriage height of tower B, in mm.
    #[arg(allow_negative_numbers = true)]
    pub b: f64,
    /// Carriage height of tower C, in mm.
    #[arg(allow_negative_numbers = true)]
    pub c: f64,

    /// Read the heights as motor step counts (rounded to whole steps).
    #[arg(long)]
    pub steps: bool,
}

#[derive(Serialize)]
struct InverseOutput {
    heights: TowerHeights,
    configuration: String,
    candidates: Vec<Coord>,
    position: Coord,
}

impl InverseArgs {
    pub fn run(&self, common: &CommonArgs) -> Result<()> {
        let config = common.load()?;
        let machine = config.machine()?;
        let geometry = machine.geometry();

        let heights = if self.steps {
            let steps = [self.a, self.b, self.c].map(|s| s.round() as i64);
            machine.heights_from_steps(steps)
        } else {
            TowerHeights::new(self.a, self.b, self.c)
        };

        let position = geometry
            .position_from_towers(&heights)
            .with_context(|| format!("no effector position for {heights}"))?;
        let output = InverseOutput {
            heights,
            configuration: format!("{:?}", Configuration::classify(&heights)).to_lowercase(),
            candidates: geometry.positions_from_towers(&heights).to_vec(),
            position,
        };

        common.print(&output, || {
            let mut text = format!("configuration: {}\n", output.configuration);
            for candidate in &output.candidates {
                let _ = writeln!(text, "candidate: {candidate}");
            }
            let _ = write!(text, "position: {}", output.position);
            text
        })
    }
}
