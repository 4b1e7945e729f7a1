#![forbid(unsafe_code)]

//! gtv: live viewer for `go test -json` streams.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("gtv: {e}");
        std::process::exit(e.exit_code());
    }
}
