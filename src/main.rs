//! `xplor-distros` binary

use clap::Parser;
use std::process::ExitCode;
use xplor_distros::cli::{init_logging, run_command, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    match run_command(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
