use std::process::ExitCode;

use clap::Parser;

use cutoutfe::cli::{self, CliArgs};
use cutoutfe::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    cli::run(args)
}
