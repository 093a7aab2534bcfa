//! Command implementations for the modelfs CLI.

use super::EntityKind;
use anyhow::{Context, Result};
use colored::Colorize;
use modelfs::config::default_config_path;
use modelfs::sync::markers::read_last_modified;
use modelfs::{Config, ResourceStorage, StorageContext};
use std::fs;
use std::path::{Path, PathBuf};

/// Load the config from `path`, or the default location
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}

fn open_context(config: &Config) -> Result<StorageContext> {
    StorageContext::from_config(config).context("Cannot open storage backends")
}

/// Print predictor metadata and stored files
pub fn info(config: &Config, predictor_id: i64) -> Result<()> {
    let context = open_context(config)?;
    let storage = context.model_storage(predictor_id)?;

    let info = storage.get_info()?;
    let phase = storage.training_state_get()?;

    println!("{} {}", "Predictor".cyan().bold(), predictor_id);
    println!(
        "  status:     {}",
        info.status.as_deref().unwrap_or("-").green()
    );
    println!("  to_predict: {}", info.to_predict.join(", "));
    println!(
        "  training:   {}/{} {}",
        phase.current.map_or("-".to_string(), |c| c.to_string()),
        phase.total.map_or("-".to_string(), |t| t.to_string()),
        phase.name.as_deref().unwrap_or("")
    );
    if let Some(data) = &info.data {
        println!("  data:       {}", serde_json::to_string(data)?);
    }

    if let Some(columns) = storage.columns_get()? {
        println!("\n{}", "Columns".cyan().bold());
        for (column, dtype) in &columns {
            println!("  {} {}", column, dtype.dimmed());
        }
    }

    let files = storage.file_list()?;
    let last_push = read_last_modified(storage.file_storage().folder_path())
        .map_or("never".to_string(), |at| at.to_rfc3339());
    println!(
        "\n{} ({}, last push: {})",
        "Files".cyan().bold(),
        files.len(),
        last_push.dimmed()
    );
    for name in &files {
        println!("  {}", name);
    }

    let values = storage.json_list()?;
    println!("\n{} ({})", "JSON values".cyan().bold(), values.len());
    for name in &values {
        println!("  {}", name);
    }

    Ok(())
}

/// Write the integration archive to `output`
pub fn export(config: &Config, integration_id: i64, output: &Path) -> Result<()> {
    let context = open_context(config)?;
    let storage = context.handler_storage(integration_id, None, false)?;

    match storage.export_files()? {
        Some(content) => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output, &content)
                .with_context(|| format!("Cannot write archive: {}", output.display()))?;
            println!(
                "  {} Exported integration {} to {} ({} bytes)",
                "✓".green(),
                integration_id,
                output.display(),
                content.len()
            );
        }
        None => {
            println!(
                "{}",
                format!("Integration {} has no files to export.", integration_id).yellow()
            );
        }
    }
    Ok(())
}

/// Extract `archive` into the integration folder and push it
pub fn import(config: &Config, integration_id: i64, archive: &Path) -> Result<()> {
    let content = fs::read(archive)
        .with_context(|| format!("Cannot read archive: {}", archive.display()))?;

    let context = open_context(config)?;
    let storage = context.handler_storage(integration_id, None, false)?;
    let written = storage.import_files(&content)?;

    println!(
        "  {} Imported {} file(s) into integration {}",
        "✓".green(),
        written,
        integration_id
    );
    Ok(())
}

/// Delete files and JSON values of an entity
pub fn purge(config: &Config, kind: EntityKind, id: i64) -> Result<()> {
    let context = open_context(config)?;
    match kind {
        EntityKind::Predictor => context.model_storage(id)?.delete()?,
        EntityKind::Integration => context.handler_storage(id, None, false)?.delete()?,
    }
    println!("  {} Purged {:?} {}", "✓".green(), kind, id);
    Ok(())
}

/// Print the config, optionally saving it first
pub fn show_config(config: &Config, path: Option<PathBuf>, init: bool) -> Result<()> {
    let path = match (init, path) {
        (true, Some(path)) => {
            config.save(&path)?;
            println!("  {} Wrote {}", "✓".green(), path.display());
            path
        }
        (true, None) => {
            let path = config.save_default()?;
            println!("  {} Wrote {}", "✓".green(), path.display());
            path
        }
        (false, path) => path.unwrap_or_else(default_config_path),
    };

    println!("{} {}", "Config".cyan().bold(), path.display().to_string().dimmed());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
