//! `bale build`

use std::time::Duration;

use bale_bundler::{BuildOutput, Bundler};

use crate::cli::BuildArgs;
use crate::commands::watch;
use crate::config;
use crate::error::{Result, ResultExt};
use crate::ui::{self, BuildProgress, SummaryRow};

/// Build once, or hand over to watch mode when `--watch` or the config's
/// `watch` flag is set.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let mut config = config::load(&args.config)?;
    if args.watch {
        config.bundle.watch = true;
    }
    if config.bundle.watch {
        return watch::run(config, None).await;
    }

    let progress = BuildProgress::new(!args.json && ui::should_show_progress());
    let bundler = Bundler::new(config.bundle)?.with_progress(progress.reporter());
    let result = bundler.build().await;
    progress.finish();
    let output = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let rows = summary_rows(&output)?;
    ui::print_build_summary(&rows, Duration::from_millis(output.stats.duration_ms));
    ui::success(&format!(
        "Built {} into {} in {}",
        ui::count(output.stats.modules, "module"),
        ui::count(output.chunks.len(), "chunk"),
        output.output_dir.display()
    ));
    Ok(())
}

/// One row per emitted file, sized from disk.
pub fn summary_rows(output: &BuildOutput) -> Result<Vec<SummaryRow>> {
    let mut rows = Vec::new();
    let mut push = |label: &str, file_name: &str| -> Result<()> {
        let path = output.output_dir.join(file_name);
        let size = std::fs::metadata(&path).with_path(&path)?.len();
        rows.push(SummaryRow {
            label: label.to_string(),
            file_name: file_name.to_string(),
            size,
        });
        Ok(())
    };

    for chunk in &output.chunks {
        push(&chunk.name, &chunk.script.file_name)?;
        if let Some(style) = &chunk.style {
            push(&chunk.name, &style.file_name)?;
        }
    }
    for asset in &output.assets {
        push(&asset.source, &asset.file.file_name)?;
    }
    Ok(rows)
}
