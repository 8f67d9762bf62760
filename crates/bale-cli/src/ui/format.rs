//! Formatting utilities for sizes, durations, and build summaries.

use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;

use super::colors_enabled;

/// Format file size in human-readable format.
///
/// ```
/// use bale_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use bale_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One emitted file in the build summary.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    /// Chunk name, or the source path for assets
    pub label: String,
    pub file_name: String,
    pub size: u64,
}

/// `count` followed by `noun`, pluralized with a trailing `s`.
///
/// ```
/// use bale_cli::ui::count;
///
/// assert_eq!(count(1, "chunk"), "1 chunk");
/// assert_eq!(count(3, "module"), "3 modules");
/// ```
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Print a table of emitted files to stderr.
pub fn print_build_summary(rows: &[SummaryRow], duration: Duration) {
    let width = usize::from(Term::stderr().size().1).min(80);
    let label_width = rows.iter().map(|row| row.label.len()).max().unwrap_or(0);
    let file_width = rows.iter().map(|row| row.file_name.len()).max().unwrap_or(0);

    let title = "Build Summary";
    if colors_enabled() {
        eprintln!("\n{}", title.bold().underline());
    } else {
        eprintln!("\n{title}");
    }
    eprintln!("{}", "─".repeat(width));

    for row in rows {
        let size = format_size(row.size);
        if colors_enabled() {
            eprintln!(
                "  {:<label_width$}  {:<file_width$}  {:>10}",
                row.label.cyan(),
                row.file_name,
                size.dimmed(),
            );
        } else {
            eprintln!(
                "  {:<label_width$}  {:<file_width$}  {:>10}",
                row.label, row.file_name, size,
            );
        }
    }

    let total: u64 = rows.iter().map(|row| row.size).sum();
    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  {} files, {} in {}",
        rows.len(),
        format_size(total),
        format_duration(duration)
    );
}
