use anyhow::{Context, Result};
use fermata_core::{DeltaGeometry, DeltaMachine, VerifyOptions};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Machine description loaded from a TOML or JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rod geometry
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Tower height, build plate and motor resolution
    #[serde(default)]
    pub machine: MachineConfig,

    /// Settings for `fermata verify`
    #[serde(default)]
    pub verify: VerifyOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Distance from the center of the build area to each tower, in mm
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Length of the rods between carriages and effector, in mm
    #[serde(default = "default_rod_length")]
    pub rod_length: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            rod_length: default_rod_length(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Carriage height at the top of the towers, in mm
    #[serde(default = "default_tower_height")]
    pub tower_height: f64,

    /// Radius of the printable area, in mm
    #[serde(default = "default_build_radius")]
    pub build_radius: f64,

    #[serde(default = "default_steps_per_mm")]
    pub steps_per_mm: f64,

    /// Lowest effector z accepted, in mm
    #[serde(default = "default_min_z")]
    pub min_z: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            tower_height: default_tower_height(),
            build_radius: default_build_radius(),
            steps_per_mm: default_steps_per_mm(),
            min_z: default_min_z(),
        }
    }
}

fn default_radius() -> f64 {
    100.0
}

fn default_rod_length() -> f64 {
    260.0
}

fn default_tower_height() -> f64 {
    800.0
}

fn default_build_radius() -> f64 {
    85.0
}

fn default_steps_per_mm() -> f64 {
    80.0
}

fn default_min_z() -> f64 {
    fermata_core::machine::DEFAULT_MIN_Z
}

impl Config {
    /// Load from `path`, or use the reference machine when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            // TOML first, then JSON
            _ => Self::from_toml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    /// Parse configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    pub fn validate(&self) -> Result<()> {
        self.machine()?;

        let tolerance = self.verify.tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            anyhow::bail!("verify.tolerance must be positive (got {tolerance})");
        }

        Ok(())
    }

    pub fn geometry(&self) -> Result<DeltaGeometry> {
        DeltaGeometry::new(self.geometry.radius, self.geometry.rod_length)
            .context("invalid [geometry] section")
    }

    pub fn machine(&self) -> Result<DeltaMachine> {
        let machine = &self.machine;
        DeltaMachine::with_min_z(
            self.geometry()?,
            machine.tower_height,
            machine.build_radius,
            machine.steps_per_mm,
            machine.min_z,
        )
        .context("invalid [machine] section")
    }
}
