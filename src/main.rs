use anyhow::Result;
use car_enrich::cli::{Command, RootArgs};
use car_enrich::workflow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    let verbose = matches!(&args.command, Command::Run(run) if run.verbose);
    init_tracing(verbose);

    match args.command {
        Command::Run(args) => workflow::run_enrich(args),
        Command::Status(args) => workflow::run_status(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over the built-in level.
fn init_tracing(verbose: bool) {
    let default_directives = if verbose { "car_enrich=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
