mod cmd;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{DepsArgs, EvalArgs, PlanArgs, RunArgs, VariantsArgs};

/// chisel - Variant build planner for multi-loader, multi-version mods
#[derive(Parser)]
#[command(name = "chisel")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compute the build plan for one variant and target version
  Plan(PlanArgs),

  /// Show the resolved dependency set
  Deps(DepsArgs),

  /// Evaluate a version predicate against a target version
  Eval(EvalArgs),

  /// List the variants declared in the manifest
  Variants(VariantsArgs),

  /// Plan, then run every step through the shell
  Run(RunArgs),
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Plan(args) => cmd::cmd_plan(args),
    Commands::Deps(args) => cmd::cmd_deps(args),
    Commands::Eval(args) => cmd::cmd_eval(args),
    Commands::Variants(args) => cmd::cmd_variants(args),
    Commands::Run(args) => cmd::cmd_run(args),
  };

  if let Err(err) = result {
    output::print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}
