//! `bale watch`

use std::time::Duration;

use bale_bundler::{BuildEvent, Bundler};
use bale_config::BaleConfig;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::cli::WatchArgs;
use crate::config;
use crate::error::Result;
use crate::ui;
use crate::watcher::{FileWatcher, WatchFilter};

pub async fn execute(args: WatchArgs) -> Result<()> {
    let config = config::load(&args.config)?;
    run(config, args.debounce).await
}

/// Build, then rebuild on file changes until Ctrl-C.
///
/// A failed rebuild is reported and the previous output stays on disk.
pub async fn run(config: BaleConfig, debounce_ms: Option<u64>) -> Result<()> {
    let quiet = Duration::from_millis(debounce_ms.unwrap_or(config.watch.debounce_ms));
    let root = config.bundle.project_root().to_path_buf();
    let filter = WatchFilter::new(&root, config.bundle.output_dir(), config.watch.ignore.clone());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = Bundler::new(config.bundle)?
        .with_events(events_tx)
        .into_watch()?;

    let (changes_tx, changes_rx) = mpsc::unbounded_channel();
    let watcher = FileWatcher::new(filter, changes_tx)?;
    let reporter = tokio::spawn(report_events(events_rx));

    ui::info(&format!(
        "Watching {} (Ctrl-C to stop)",
        watcher.root().display()
    ));

    tokio::select! {
        _ = session.run(changes_rx, quiet) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            ui::info("Stopping");
        }
    }

    drop(watcher);
    // The session owned the event sender, so the reporter drains and exits.
    let _ = reporter.await;
    Ok(())
}

async fn report_events(mut events: UnboundedReceiver<BuildEvent>) {
    let mut rebuild = false;
    while let Some(event) = events.recv().await {
        match event {
            BuildEvent::Started if rebuild => ui::info("Rebuilding..."),
            BuildEvent::Started => ui::info("Building..."),
            BuildEvent::Progress(_) => {}
            BuildEvent::Completed(output) => {
                rebuild = true;
                ui::success(&format!(
                    "Built {} in {} ({} written, {} unchanged)",
                    ui::count(output.chunks.len(), "chunk"),
                    ui::format_duration(Duration::from_millis(output.stats.duration_ms)),
                    output.stats.written,
                    output.stats.reused
                ));
            }
            BuildEvent::Failed(error) if error.is_cancelled() => {}
            BuildEvent::Failed(error) => {
                let diagnostics = error.diagnostics();
                if diagnostics.is_empty() {
                    ui::error(&error.to_string());
                } else {
                    for diagnostic in diagnostics {
                        ui::error(&diagnostic.to_string());
                    }
                }
                if rebuild {
                    ui::warning("Keeping the previous output");
                }
                rebuild = true;
            }
        }
    }
}
