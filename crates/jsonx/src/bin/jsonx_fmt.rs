//! Reformat JSON from stdin or a file to stdout.
//!
//! Usage:
//!   jsonx-fmt [--indent N] [--compact] [FILE]
//!
//! Logging goes to stderr and is controlled by `JSONX_LOG`.

use std::io::{self, Write};

use clap::Parser;
use jsonx::cli::{init_logging, run, FmtArgs};

fn main() {
    init_logging();
    let args = FmtArgs::parse();

    match run(&args) {
        Ok(out) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{out}") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
