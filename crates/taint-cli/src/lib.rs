//! A thin manual-invocation command over [`taint_dataflow::scan_parser`].
//!
//! CLI parsing proper, sink/repair-function *discovery*, scan orchestration
//! across a whole repository and CSV/JSON/XML/HTML report formatting are
//! explicit Non-goals of the core (spec §1) — this crate exists only so a
//! single file can be scanned by hand while developing the analyzer, the
//! way `cr-cli`/`astgrep-cli` drive their own analyzers in the teacher
//! repo. Output is the bare `Finding` list as JSON; nothing fancier.

use clap::Parser;
use std::path::PathBuf;
use taint_core::RepairFunctions;
use tracing::{error, info};

/// Scan a single PHP file for a taint flow reaching one sink call site.
#[derive(Parser)]
#[command(name = "taint-cli")]
#[command(about = "Manually drive the PHP taint-tracking analyzer against one file")]
#[command(version)]
pub struct Cli {
    /// PHP file to analyze.
    pub file: PathBuf,

    /// Sink names to look for at `--sink-line` (e.g. `eval`, `echo`,
    /// `mysql_query`). Repeatable.
    #[arg(short, long = "sink", required = true)]
    pub sinks: Vec<String>,

    /// 1-based line of the sink call site.
    #[arg(short = 'l', long)]
    pub sink_line: u32,

    /// Function names whose return value is considered sanitized.
    /// Repeatable.
    #[arg(short, long = "repair")]
    pub repair_functions: Vec<String>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs the CLI: reads `cli.file`, invokes the scan, prints the findings as
/// JSON to stdout. Returns the process exit code (`0` if findings is
/// non-empty is intentionally *not* the convention here — this is a
/// debugging aid, not a CI gate, so the exit code only reflects whether the
/// scan itself ran without an I/O failure).
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    init_logging(cli.verbose);

    let code_text = std::fs::read_to_string(&cli.file)
        .map_err(|err| anyhow::anyhow!("could not read {}: {err}", cli.file.display()))?;

    info!(file = %cli.file.display(), sink_line = cli.sink_line, "scanning");
    let findings = taint_dataflow::scan_parser(
        &code_text,
        &cli.sinks,
        cli.sink_line,
        &cli.file,
        RepairFunctions::new(cli.repair_functions),
    );

    match serde_json::to_string_pretty(&findings) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!(%err, "failed to serialize findings");
            return Ok(1);
        }
    }
    Ok(0)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from([
            "taint-cli",
            "a.php",
            "--sink",
            "eval",
            "--sink-line",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.sinks, vec!["eval".to_string()]);
        assert_eq!(cli.sink_line, 1);
        assert!(cli.repair_functions.is_empty());
    }

    #[test]
    fn run_reports_findings_for_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.php");
        std::fs::write(&path, "<?php $x = $_GET['id']; eval($x); ?>").unwrap();
        let cli = Cli {
            file: path,
            sinks: vec!["eval".to_string()],
            sink_line: 1,
            repair_functions: vec![],
            verbose: false,
        };
        let code = run(cli).unwrap();
        assert_eq!(code, 0);
    }
}
