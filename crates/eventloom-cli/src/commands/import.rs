//! Run an import

use anyhow::{Context, Result};
use eventloom_core::{Config, FileSink, Importer, RecordSink};

/// Run the import command
///
/// `files` replaces the configured file list when non-empty, and `output`
/// replaces the configured sink with a JSON-lines file.
pub async fn run(config_path: &str, files: &[String], output: Option<&str>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("Project: {}", config.project.name);

    let sink: Box<dyn RecordSink> = match output {
        Some(path) => Box::new(FileSink::new(path)),
        None => config
            .project
            .sink
            .build(&config.base_path)
            .context("Failed to create sink")?,
    };

    let mut importer =
        Importer::from_config_with_sink(&config, sink).context("Failed to load transforms")?;

    tracing::info!(
        "Importing into '{}' with {} translators (press Ctrl+C to stop)",
        importer.table_name(),
        importer.translators().len()
    );

    let import = async {
        if files.is_empty() {
            importer.import_configured().await
        } else {
            importer.import(files).await
        }
    };

    tokio::select! {
        result = import => {
            let stats = result.context("Import failed")?;
            tracing::info!(
                "✓ Imported {} records from {} files",
                stats.records,
                stats.files
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to install Ctrl+C handler")?;
            anyhow::bail!("Import interrupted");
        }
    }

    Ok(())
}
