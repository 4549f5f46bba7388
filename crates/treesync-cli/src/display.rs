//! Display utilities for TreeSync CLI

use console::style;
use std::time::Duration;
use treesync_types::{FolderHash, ProgressSnapshot, RunReport};

/// Print the summary of a finished run
pub fn display_run_report(report: &RunReport) {
    println!();
    println!("{}", style("Sync Summary:").bold().underlined());
    println!(
        "  Source: {}",
        style(report.source.display()).cyan()
    );
    println!(
        "  Destination: {}",
        style(report.destination.display()).cyan()
    );
    display_scan_counts(&report.scan);
    println!(
        "  Folders created: {}",
        style(report.transfer.folder_count).green()
    );
    println!(
        "  Files copied: {}",
        style(report.transfer.file_count).green()
    );
    println!(
        "  Files skipped: {}",
        style(report.scan.file_count.saturating_sub(report.transfer.file_count)).yellow()
    );
    println!(
        "  Duration: {}",
        style(format_duration(report.duration)).blue()
    );
    println!(
        "  Rate: {}",
        style(format!("{:.1} files/s", report.file_rate())).blue()
    );
    println!("  Run ID: {}", style(report.run_id).dim());
}

/// Print the counters of a scan
pub fn display_scan_counts(scan: &ProgressSnapshot) {
    println!("  Folders scanned: {}", style(scan.folder_count).green());
    println!("  Files scanned: {}", style(scan.file_count).green());
}

/// Print a root fingerprint
pub fn display_fingerprint(hash: Option<FolderHash>) {
    match hash {
        Some(hash) => println!("  Root fingerprint: {}", style(hash).cyan()),
        None => println!("  Root fingerprint: {}", style("unavailable").yellow()),
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display a warning message with proper formatting
pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

/// Display an info message with proper formatting
pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(1500), "1.50s")]
    #[case(Duration::from_secs(125), "2m 5s")]
    #[case(Duration::from_secs(3725), "1h 2m 5s")]
    fn test_format_duration(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }
}
