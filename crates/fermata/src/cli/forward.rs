use super::CommonArgs;
use anyhow::{Context, Result};
use clap::Args;
use fermata_core::Coord;

#[derive(Args)]
pub struct ForwardArgs {
    /// Effector x, in mm.
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    /// Effector y, in mm.
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
    /// Effector z, in mm.
    #[arg(allow_negative_numbers = true)]
    pub z: f64,

    /// Pull the position into the printable volume first.
    #[arg(long)]
    pub bound: bool,
}

impl ForwardArgs {
    pub fn run(&self, common: &CommonArgs) -> Result<()> {
        let config = common.load()?;
        let machine = config.machine()?;

        let mut p = Coord::new(self.x, self.y, self.z);
        if self.bound {
            p = machine.bound(p);
            tracing::debug!(%p, "bounded position");
        }

        let heights = machine
            .geometry()
            .towers_from_position(p)
            .with_context(|| format!("no carriage heights for {p}"))?;

        common.print(&heights, || heights.to_string())
    }
}
