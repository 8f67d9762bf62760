//! Logging setup for the bale CLI.
//!
//! Level is chosen in this order:
//! 1. `--verbose`: debug for bale crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. warnings for bale crates; progress and results are shown by `ui`
//!
//! Logs go to stderr, without timestamps, so `--json` output on stdout
//! stays parseable and log lines sit next to status lines cleanly.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "bale_cli=debug,bale_bundler=debug,bale_graph=debug,bale_config=debug";
const QUIET_FILTER: &str = "error";
const DEFAULT_FILTER: &str = "bale_cli=warn,bale_bundler=warn,bale_graph=warn,bale_config=warn";

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = filter_for(verbose, quiet, std::env::var("RUST_LOG").ok().as_deref());
    init_logger_with_filter(filter, no_color);
}

/// Install the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .without_time()
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        rust_log
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Whether stderr output should carry ANSI colors.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
