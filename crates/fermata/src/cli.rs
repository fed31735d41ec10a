use crate::config::Config;
use anyhow::Result;
use clap::Args;
use fermata_core::{Coord, Tower};
use serde::Serialize;
use std::path::PathBuf;

pub mod forward;
pub mod inverse;
pub mod step;
pub mod trace;
pub mod verify;

/// Options shared by every subcommand.
#[derive(Args)]
pub struct CommonArgs {
    /// Path to the machine configuration file (TOML or JSON).
    ///
    /// Defaults to the reference machine (r = 100, L = 260, h = 800).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

impl CommonArgs {
    pub fn load(&self) -> Result<Config> {
        let config = Config::load(self.config.as_deref())?;
        match &self.config {
            Some(path) => tracing::info!(path = %path.display(), "loaded configuration"),
            None => tracing::info!("using the reference machine"),
        }
        Ok(config)
    }

    pub fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// Parse `x,y,z`.
pub fn parse_coord(s: &str) -> Result<Coord, String> {
    let parts = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid number in {s:?}: {err}"))?;
    match parts[..] {
        [x, y, z] => Ok(Coord::new(x, y, z)),
        _ => Err(format!("expected x,y,z but got {} value(s)", parts.len())),
    }
}

pub fn parse_tower(s: &str) -> Result<Tower, String> {
    Tower::parse(s).ok_or_else(|| format!("unknown tower {s:?}, expected a, b or c"))
}
