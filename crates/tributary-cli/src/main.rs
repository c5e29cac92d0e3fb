//! Tributary CLI - lay out and replay interactive data lineage views

mod cli;
mod script;
mod summary;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    let mut app = cli::TributaryApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
