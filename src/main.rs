//! diag-replay - Offline Analysis of an Exported Diagnostics Session
//!
//! Usage: `diag-replay <snapshot.json|snapshot.jsonl> [backend-status.json]`
//!
//! Prints the plain-language event log, then every detected problem.
//! Analysis runs as of the snapshot's export time.

use std::path::Path;
use std::process::ExitCode;

use terminal_diagnostics::logic::telemetry::{format_events, read_snapshot};
use terminal_diagnostics::{BackendStatus, DiagResult, DiagnosticsConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(snapshot_path) = args.first() else {
        eprintln!("Usage: diag-replay <snapshot.json|snapshot.jsonl> [backend-status.json]");
        return ExitCode::from(2);
    };

    match run(Path::new(snapshot_path), args.get(1).map(Path::new)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("diag-replay failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(snapshot_path: &Path, backend_path: Option<&Path>) -> DiagResult<()> {
    let config = DiagnosticsConfig::from_env();
    let snapshot = read_snapshot(snapshot_path)?;

    log::info!(
        "Replaying session {} ({} events buffered, {} recorded)",
        snapshot.session_id,
        snapshot.events.len(),
        snapshot.total_event_count
    );

    for formatted in format_events(&snapshot.events, &config) {
        println!("{}", formatted.line());
    }

    let report = match backend_path {
        Some(path) => {
            let backend: BackendStatus = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            snapshot.analyze_with_backend(&config, &backend)
        }
        None => snapshot.analyze(&config),
    };

    let summary = report.summary();
    println!();
    println!("Problems detected: {}", summary.problem_count);
    for problem in &summary.problems {
        println!("- {} ({}): {}", problem.problem, problem.detector, problem.explanation);
    }

    Ok(())
}
