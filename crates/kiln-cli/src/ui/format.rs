//! Formatting for sizes, durations and build reports.

use crate::build::{BuildOutcome, ErrorDetail};
use console::Term;
use super::paint;
use owo_colors::Style;
use std::time::Duration;

/// Human-readable size.
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Human-readable duration: `50ms`, `1.50s`, `1m 30s`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn rule() -> String {
    let width = Term::stderr().size().1 as usize;
    "─".repeat(width.clamp(20, 80))
}

/// Print the emitted assets of one build to stderr.
pub fn print_build_summary(outcome: &BuildOutcome) {
    eprintln!(
        "\n{}",
        paint(
            format!("Build Summary ({})", outcome.target),
            Style::new().bold().underline()
        )
    );
    eprintln!("{}", rule());

    let mut assets: Vec<_> = outcome.assets.iter().collect();
    assets.sort_by(|a, b| a.name.cmp(&b.name));

    for asset in assets {
        eprintln!(
            "  {} {} {}",
            paint("▸", Style::new().blue()),
            paint(&asset.name, Style::new().bright_white().bold()),
            paint(format_size(asset.size), Style::new().dimmed())
        );
    }

    eprintln!("{}", rule());
    eprintln!(
        "  {} {} in {} asset{}, {}",
        paint("Total:", Style::new().bold()),
        paint(format_size(outcome.total_size()), Style::new().green()),
        outcome.assets.len(),
        if outcome.assets.len() == 1 { "" } else { "s" },
        paint(format_duration(outcome.duration), Style::new().green())
    );

    if !outcome.warnings.is_empty() {
        eprintln!(
            "  {}",
            paint(
                format!("{} warning(s)", outcome.warnings.len()),
                Style::new().yellow()
            )
        );
    }
}

/// Print the compile errors of one build to stderr.
pub fn print_diagnostics(outcome: &BuildOutcome) {
    if outcome.errors.is_empty() {
        return;
    }

    eprintln!(
        "\n{}",
        paint(
            format!(
                "{} error(s) in {} build",
                outcome.errors.len(),
                outcome.target
            ),
            Style::new().red().bold()
        )
    );

    for detail in &outcome.errors {
        eprintln!("{}", format_diagnostic(detail));
    }
}

fn format_diagnostic(detail: &ErrorDetail) -> String {
    match detail.location() {
        Some(location) => format!(
            "  {} {}\n    {}",
            paint("✗", Style::new().red()),
            paint(location, Style::new().bold()),
            detail.message
        ),
        None => format!("  {} {}", paint("✗", Style::new().red()), detail.message),
    }
}
