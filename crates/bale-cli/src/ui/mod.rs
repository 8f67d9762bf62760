//! Terminal output: status messages, the build progress bar and summaries.
//!
//! Everything here writes to stderr. Progress bars are hidden when stderr is
//! not a terminal or when running in CI.

mod format;
mod messages;
mod progress;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{SummaryRow, count, format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};
pub use progress::BuildProgress;

static COLORS: AtomicBool = AtomicBool::new(true);

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Check if color output should be enabled.
///
/// Respects `NO_COLOR` and `FORCE_COLOR`, then falls back to whether stderr
/// is attended.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Decide once whether messages and progress bars use color.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled_stderr(enabled);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Whether an interactive progress bar makes sense.
pub fn should_show_progress() -> bool {
    console::user_attended_stderr() && !is_ci()
}
