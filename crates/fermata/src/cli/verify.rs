use super::CommonArgs;
use anyhow::Result;
use clap::Args;
use fermata_core::{Report, VerificationHarness};
use std::fmt::Write as _;

#[derive(Args)]
pub struct VerifyArgs {
    /// Override the number of random round trips.
    #[arg(long)]
    pub samples: Option<usize>,

    /// Override the random seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl VerifyArgs {
    pub fn run(&self, common: &CommonArgs) -> Result<()> {
        let config = common.load()?;
        let geometry = config.geometry()?;

        let mut options = config.verify;
        if let Some(samples) = self.samples {
            options.samples = samples;
        }
        if let Some(seed) = self.seed {
            options.seed = seed;
        }

        let report = VerificationHarness::new(&geometry, options).run();
        for case in report.failures() {
            tracing::warn!(name = %case.name, detail = %case.detail, "verification case failed");
        }
        if !report.fuzz.passed() {
            tracing::warn!(
                failures = report.fuzz.failures,
                max_error = report.fuzz.max_error,
                "round trips failed"
            );
        }

        common.print(&report, || render(&report))?;

        if !report.passed() {
            anyhow::bail!("verification failed");
        }
        Ok(())
    }
}

fn render(report: &Report) -> String {
    let mut text = String::new();
    for case in &report.cases {
        let status = if case.passed { "ok" } else { "FAIL" };
        let _ = writeln!(text, "[{status:>4}] {}: {}", case.name, case.detail);
    }
    let fuzz = &report.fuzz;
    let status = if fuzz.passed() { "ok" } else { "FAIL" };
    let _ = write!(
        text,
        "[{status:>4}] {} round trips (seed {}): {} failed, max error {:.3e}",
        fuzz.samples, fuzz.seed, fuzz.failures, fuzz.max_error
    );
    text
}
