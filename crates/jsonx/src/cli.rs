//! Reformat JSON read from stdin or a file.
//!
//! Provides the logic behind the `jsonx-fmt` binary so it can be tested
//! without spawning a process.

use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::json::{parse, ParseError, StringifyOptions};
use crate::JsonxEncoder;

/// Environment variable holding the log filter, e.g. `JSONX_LOG=debug`.
pub const LOG_ENV: &str = "JSONX_LOG";

#[derive(Debug, Parser)]
#[command(name = "jsonx-fmt", version, about = "Reformat JSON from stdin or a file")]
pub struct FmtArgs {
    /// Spaces per nesting level (clamped to 10).
    #[arg(long, short, default_value_t = 2)]
    pub indent: usize,
    /// Write single-line output.
    #[arg(long, short)]
    pub compact: bool,
    /// Input file; stdin when omitted.
    pub file: Option<PathBuf>,
}

impl FmtArgs {
    pub fn stringify_options(&self) -> StringifyOptions {
        let indent = if self.compact { 0 } else { self.indent };
        StringifyOptions::default().with_indent(indent)
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{line}:{column}: {source}")]
    Parse {
        line: usize,
        column: usize,
        #[source]
        source: ParseError,
    },
}

/// Install a stderr `tracing` subscriber filtered by [`LOG_ENV`] (default
/// `warn`). Calling it twice is harmless.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Parse `text` and re-serialize it with the options from `args`.
pub fn format_text(text: &str, args: &FmtArgs) -> Result<String, CliError> {
    let value = parse(text).map_err(|source| {
        let (line, column) = source.line_col(text);
        CliError::Parse {
            line,
            column,
            source,
        }
    })?;
    let encoder = JsonxEncoder::with_options(args.stringify_options());
    Ok(encoder.encode(&value))
}

/// Read the input named by `args` and format it.
pub fn run(args: &FmtArgs) -> Result<String, CliError> {
    let text = match &args.file {
        Some(path) => {
            debug!(path = %path.display(), "reading input file");
            std::fs::read_to_string(path)?
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let out = format_text(&text, args)?;
    info!(input_bytes = text.len(), output_bytes = out.len(), "formatted");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> FmtArgs {
        let mut argv = vec!["jsonx-fmt"];
        argv.extend_from_slice(extra);
        FmtArgs::parse_from(argv)
    }

    #[test]
    fn defaults_to_two_space_indent() {
        let out = format_text(r#"{"a":[1]}"#, &args(&[])).unwrap();
        assert_eq!(out, "{\n  \"a\": [\n    1\n  ]\n}");
    }

    #[test]
    fn compact_flag_wins_over_indent() {
        let out = format_text(" { \"a\" : [ 1 ] } ", &args(&["--compact", "--indent", "4"])).unwrap();
        assert_eq!(out, r#"{"a":[1]}"#);
    }

    #[test]
    fn parse_failure_reports_line_and_column() {
        let err = format_text("{\n  \"a\": nope\n}", &args(&[])).unwrap_err();
        match &err {
            CliError::Parse { line, column, .. } => assert_eq!((*line, *column), (2, 9)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("2:9: unexpected character 'o'"));
    }

    #[test]
    fn reads_input_file() {
        let path = std::env::temp_dir().join(format!("jsonx-fmt-{}.json", std::process::id()));
        std::fs::write(&path, "[true,null]").unwrap();
        let out = run(&args(&["-c", path.to_str().unwrap()])).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(out, "[true,null]");
    }
}
