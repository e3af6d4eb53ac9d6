//! Binary entrypoint for the `tapedeck` CLI.

use std::process::ExitCode;

use env_logger::Env;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    match tapedeck::run(std::env::args()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(tapedeck::Error::Cli(err)) => {
            // Prints help and version to stdout with a zero status.
            err.exit()
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
