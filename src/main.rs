#![forbid(unsafe_code)]

//! tutor: Python Tutor CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    // .env is optional.
    let _ = dotenvy::dotenv();
    let args = cli_app::Cli::parse();
    cli_app::init_tracing(&args);
    if let Err(e) = cli_app::run(&args) {
        eprintln!("tutor: {e}");
        std::process::exit(e.exit_code());
    }
}
