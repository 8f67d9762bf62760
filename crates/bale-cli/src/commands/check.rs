//! `bale check`
//!
//! Loads the configuration, verifies entry files exist, then builds and
//! plans the module graph without writing anything.

use bale_bundler::Bundler;
use bale_config::validate_fs;

use crate::cli::CheckArgs;
use crate::config;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CheckArgs) -> Result<()> {
    let config = config::load(&args.config)?;
    let options = config.bundle;
    validate_fs(&options, options.project_root())?;
    if !args.json {
        ui::success(&format!(
            "Configuration is valid ({} entries, {} mode)",
            options.entry.len(),
            options.mode.as_str()
        ));
    }

    let report = Bundler::new(options)?.check().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for chunk in &report.chunks {
        ui::info(&format!(
            "{} -> {} ({})",
            chunk.name,
            chunk.script.file_name,
            ui::count(chunk.modules.len(), "module")
        ));
    }
    ui::success(&format!(
        "{} resolved, {} planned, {}",
        ui::count(report.modules, "module"),
        ui::count(report.chunks.len(), "chunk"),
        ui::count(report.assets, "asset")
    ));
    Ok(())
}
