//! Terminal output for run results and errors

use anyhow::Error;
use colored::*;
use firmsync_engine::RunReport;

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Headline for a finished run.
pub fn report_status(report: &RunReport) -> ColoredString {
    if report.interrupted {
        "Interrupted:".yellow().bold()
    } else if report.has_failures() {
        "Finished with failures:".red().bold()
    } else {
        "Synchronized:".green().bold()
    }
}

/// Print the run totals to stdout.
pub fn print_report(report: &RunReport) {
    println!("{} {}", report_status(report), report);
    let elapsed = report.finished_at.signed_duration_since(report.started_at);
    println!(
        "  {} {:.1}s",
        "Elapsed:".dimmed(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}
