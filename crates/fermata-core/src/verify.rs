//! Self-check for a machine geometry.
//!
//! Runs a fixed set of configurations with known closed-form answers, then
//! round-trips seeded random points through forward and inverse kinematics.
//! The result is a plain [`Report`] so callers can print or serialize it.

use crate::{
    geometry::{Coord, DeltaGeometry, MotionState, Tower},
    kinematics::GeometryInfeasible,
    step_time::{StepDirection, StepError},
};
use core::f64::consts::TAU;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

/// Fraction of the rod's spare reach (`L - r`) sampled by the fuzzer.
const FUZZ_REACH: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyOptions {
    /// Random round trips to run.
    pub samples: usize,
    pub seed: u64,
    /// Accepted error, relative to the rod length for positions and to the
    /// expected value (or one second) for times.
    pub tolerance: f64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: 1,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzReport {
    pub samples: usize,
    pub seed: u64,
    pub failures: usize,
    /// Largest round-trip error seen, relative to the rod length.
    pub max_error: f64,
    /// Sample with the largest error.
    pub worst: Option<Coord>,
}

impl FuzzReport {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub cases: Vec<CaseReport>,
    pub fuzz: FuzzReport,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|case| case.passed) && self.fuzz.passed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|case| !case.passed)
    }
}

pub struct VerificationHarness<'g> {
    geometry: &'g DeltaGeometry,
    options: VerifyOptions,
}

impl<'g> VerificationHarness<'g> {
    pub fn new(geometry: &'g DeltaGeometry, options: VerifyOptions) -> Self {
        Self { geometry, options }
    }

    pub fn run(&self) -> Report {
        Report {
            cases: self.canonical(),
            fuzz: self.fuzz(),
        }
    }

    /// Configurations with closed-form expectations: the center axis, the
    /// plane bisecting towers B and C, a general point, and step timing
    /// along the x axis through the center.
    pub fn canonical(&self) -> Vec<CaseReport> {
        let g = self.geometry;
        let r = g.radius();
        let l = g.rod_length();
        let mut cases = vec![
            self.round_trip_case("center", Coord::new(0.0, 0.0, 0.1 * l)),
            self.round_trip_case("symmetric pair", Coord::new(0.0, 0.25 * r, -0.1 * l)),
            self.round_trip_case("near symmetric pair", Coord::new(1e-12 * r, 0.25 * r, 0.0)),
            self.round_trip_case("general", Coord::new(0.3 * r, -0.2 * r, 0.05 * l)),
        ];

        let h0 = g.center_drop();
        let drop_time = |s: f64| (h0 * h0 - (h0 + s) * (h0 + s)).sqrt();
        let away = MotionState::new(Coord::ZERO, Coord::new(1.0, 0.0, 0.0));
        let back = MotionState::new(Coord::ZERO, Coord::new(-1.0, 0.0, 0.0));

        for (state, label, s) in [
            (&away, "+x", -1.0),
            (&away, "+x", -2.0),
            (&away, "+x", -3.0),
            (&back, "-x", -2.0),
            (&back, "-x", -3.0),
        ] {
            let name = format!("step A {s:+} along {label}");
            cases.push(match g.time_to_reach(Tower::A, s, state) {
                Ok(t) => self.time_case(name, t, drop_time(s)),
                Err(err) => fail(name, err.to_string()),
            });
        }

        cases.push(match g.time_to_reach(Tower::A, 3.0, &away) {
            Err(StepError::WrongDirection) => pass("step A +3 along +x", "wrong direction"),
            other => fail("step A +3 along +x", format!("expected wrong direction, got {other:?}")),
        });

        let name = "direction A from center";
        cases.push(match g.time_and_direction_to_reach(Tower::A, 1.0, &away) {
            Ok(Some(event)) if event.direction == StepDirection::Backward => {
                self.time_case(name.into(), event.time, drop_time(-1.0))
            }
            other => fail(name, format!("expected a backward step, got {other:?}")),
        });

        let still = MotionState::new(Coord::new(0.1 * r, 0.1 * r, 0.0), Coord::ZERO);
        cases.push(match g.time_and_direction_to_reach(Tower::B, 1.0, &still) {
            Ok(None) => pass("stationary", "no crossing"),
            other => fail("stationary", format!("expected no crossing, got {other:?}")),
        });

        cases.push(self.monotonic_case(&away));

        for case in &cases {
            tracing::trace!(name = %case.name, passed = case.passed, detail = %case.detail, "case");
        }
        cases
    }

    /// Seeded round trips through forward and inverse kinematics for points
    /// inside the reachable envelope.
    pub fn fuzz(&self) -> FuzzReport {
        let g = self.geometry;
        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let reach = FUZZ_REACH * (g.rod_length() - g.radius());
        let mut report = FuzzReport {
            samples: self.options.samples,
            seed: self.options.seed,
            failures: 0,
            max_error: 0.0,
            worst: None,
        };

        for _ in 0..self.options.samples {
            // uniform over the disk
            let rho = reach * rng.random_range(0.0f64..1.0).sqrt();
            let theta = rng.random_range(0.0..TAU);
            let z = rng.random_range(-g.rod_length()..g.rod_length());
            let p = Coord::new(rho * theta.cos(), rho * theta.sin(), z);

            let error = round_trip_error(g, p).unwrap_or(f64::INFINITY);
            if !(error <= self.options.tolerance) {
                report.failures += 1;
                tracing::trace!(%p, error, "round trip failed");
            }
            if report.worst.is_none() || !(error <= report.max_error) {
                report.max_error = error;
                report.worst = Some(p);
            }
        }
        report
    }

    fn round_trip_case(&self, name: &str, p: Coord) -> CaseReport {
        match round_trip_error(self.geometry, p) {
            Ok(error) if error <= self.options.tolerance => {
                pass(name, format!("{p} round trip error {error:.3e}"))
            }
            Ok(error) => fail(name, format!("{p} round trip error {error:.3e}")),
            Err(err) => fail(name, format!("{p}: {err}")),
        }
    }

    fn time_case(&self, name: String, actual: f64, expected: f64) -> CaseReport {
        let error = (actual - expected).abs() / expected.abs().max(1.0);
        let detail = format!("t = {actual:.9}, expected {expected:.9}");
        if error <= self.options.tolerance {
            pass(name, detail)
        } else {
            fail(name, detail)
        }
    }

    fn monotonic_case(&self, state: &MotionState) -> CaseReport {
        let name = "step time grows with offset";
        let mut last = 0.0;
        for k in 1..=10 {
            let s = -0.5 * k as f64;
            match self.geometry.time_to_reach(Tower::A, s, state) {
                Ok(t) if t >= last => last = t,
                Ok(t) => return fail(name, format!("s = {s}: t = {t} after {last}")),
                Err(err) => return fail(name, format!("s = {s}: {err}")),
            }
        }
        pass(name, format!("t = {last:.9} at s = -5"))
    }
}

/// Distance from `p` to its inverse-kinematics image, relative to the rod
/// length.
///
/// The canonical solution must also appear among the filtered candidates.
pub fn round_trip_error(geometry: &DeltaGeometry, p: Coord) -> Result<f64, GeometryInfeasible> {
    let heights = geometry.towers_from_position(p)?;
    let canonical = geometry.position_from_towers(&heights)?;
    let scale = geometry.rod_length();
    if !geometry
        .positions_from_towers(&heights)
        .contains_near(canonical, scale * f64::EPSILON * 16.0)
    {
        return Ok(f64::INFINITY);
    }
    Ok(canonical.max_abs_diff(p) / scale)
}

fn pass(name: impl Into<String>, detail: impl Into<String>) -> CaseReport {
    CaseReport {
        name: name.into(),
        passed: true,
        detail: detail.into(),
    }
}

fn fail(name: impl Into<String>, detail: impl Into<String>) -> CaseReport {
    CaseReport {
        name: name.into(),
        passed: false,
        detail: detail.into(),
    }
}
