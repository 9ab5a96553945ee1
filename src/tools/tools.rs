mod dump_term;
use dump_term::dump_term;
mod run_format;
use run_format::run_format;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Inspect terminfo binaries and run capability format strings
#[derive(Clone, Debug, Parser)]
struct Args {
    #[command(subcommand)]
    operation: Operation,
}

/// Wire dialect a `dump` should decode
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Dialect {
    /// the standard terminfo binary format
    Standard,
    /// the NetBSD curses alternate binary format
    Netbsd,
}

#[derive(Clone, Debug, Subcommand)]
enum Operation {
    /// Parse a compiled terminfo entry and dump its capabilities as text
    Dump(DumpArgs),
    /// Run a capability format string against numeric parameters
    Format(FormatArgs),
}

#[derive(Clone, Debug, Parser)]
struct DumpArgs {
    /// compiled terminfo file to parse
    input: std::path::PathBuf,
    /// wire dialect to decode
    #[arg(short, long, value_enum, default_value = "standard")]
    dialect: Dialect,
}

#[derive(Clone, Debug, Parser)]
struct FormatArgs {
    /// the %-escape format string, e.g. "%p1%d"
    fmt: String,
    /// integer parameters, filled into %p1.. in order (absent ones are 0)
    #[arg(short, long = "param")]
    params: Vec<i32>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    match &args.operation {
        Operation::Dump(dump_args) => dump_term(dump_args),
        Operation::Format(format_args) => run_format(format_args),
    }
}
