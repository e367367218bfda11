use std::process::ExitCode;

use apart_app::platform::{self, LogDestination};
use clap::Parser;

/// Partition backup front end driving the apart-core worker.
#[derive(Debug, Parser)]
#[command(name = "apart", version, about)]
struct Cli {
    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    log: LogDestination,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match platform::run_app(cli.log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("apart: {err:#}");
            ExitCode::from(1)
        }
    }
}
