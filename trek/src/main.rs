#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod args;
mod explain;

use std::process::ExitCode;
use trek_core::Verdict;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match args::Args::parse_and_run().await {
        Ok(Verdict::Allowed) => ExitCode::SUCCESS,
        Ok(Verdict::Blocked) => ExitCode::from(1),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(2)
        }
    }
}
