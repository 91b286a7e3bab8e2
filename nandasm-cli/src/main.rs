//! nandasm CLI: assemble and format nandasm source.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/configuration/source error
//! - 3: Internal assembler fault

mod commands;

use std::io;
use std::process;

use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "nandasm", version, about = "Assembler for configurable toy instruction sets")]
struct Cli {
    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, global = true, default_value_t = Level::WARN)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble source to a binary
    Assemble(commands::AssembleArgs),
    /// Rewrite source in canonical layout
    Format(commands::FormatArgs),
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = match e.print() {
                Ok(()) if !e.use_stderr() => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    let result = match &cli.command {
        Command::Assemble(args) => commands::assemble(args),
        Command::Format(args) => commands::format(args),
    };

    if let Err(code) = result {
        process::exit(code);
    }
}
