use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Forward(args) => args.run(&cli.common),
        Command::Inverse(args) => args.run(&cli.common),
        Command::Step(args) => args.run(&cli.common),
        Command::Trace(args) => args.run(&cli.common),
        Command::Verify(args) => args.run(&cli.common),
    }
}

#[derive(Parser)]
#[command(name = "fermata", about = "Kinematics and step timing for linear delta robots")]
struct Cli {
    #[command(flatten)]
    common: cli::CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Carriage heights for an effector position.
    Forward(cli::forward::ForwardArgs),
    /// Effector position for carriage heights.
    Inverse(cli::inverse::InverseArgs),
    /// Time until a tower's carriage reaches an offset, or its next step.
    Step(cli::step::StepArgs),
    /// Every step of a straight-line move.
    Trace(cli::trace::TraceArgs),
    /// Check the kinematics of the configured machine.
    Verify(cli::verify::VerifyArgs),
}
