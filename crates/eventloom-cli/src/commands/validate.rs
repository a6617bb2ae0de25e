//! Validate configuration command

use anyhow::{Context, Result};
use eventloom_core::{Config, load_transform_file};

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Table: {}", config.project.table);

    config
        .project
        .sink
        .build(&config.base_path)
        .context("Invalid sink configuration")?;

    let mut problems = Vec::new();
    let mut total = 0;

    for path in config.transform_paths() {
        let translators = load_transform_file(&path)
            .with_context(|| format!("Failed to load transform {}", path.display()))?;

        for translator in &translators {
            if let Err(e) = translator.check() {
                tracing::error!("✗ {}: {}", path.display(), e);
                problems.push(e);
            }
        }

        tracing::info!("✓ {}: {} translators", path.display(), translators.len());
        total += translators.len();
    }

    for path in config.file_paths() {
        if !path.exists() {
            tracing::warn!("Source file {} does not exist yet", path.display());
        }
    }

    if !problems.is_empty() {
        anyhow::bail!("{} of {} translators are invalid", problems.len(), total);
    }

    tracing::info!("✓ Configuration is valid ({} translators)", total);
    Ok(())
}
