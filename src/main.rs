use clap::Parser;
use sepatrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
