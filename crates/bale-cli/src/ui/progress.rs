//! Build progress bar fed by the bundler's progress callback.

use std::sync::Arc;
use std::time::Duration;

use bale_bundler::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};

const STEPS: u64 = 100;

/// A progress bar from 0 to 100% driven by [`ProgressReporter`] values.
///
/// Hidden when `visible` is false, so callers can wire it up unconditionally.
pub struct BuildProgress {
    bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(STEPS)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.set_message("bundling");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Callback for [`bale_bundler::Bundler::with_progress`].
    pub fn reporter(&self) -> ProgressReporter {
        let bar = self.bar.clone();
        Arc::new(move |fraction: f64| bar.set_position(to_steps(fraction)))
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for BuildProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn to_steps(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * STEPS as f64).round() as u64
}
