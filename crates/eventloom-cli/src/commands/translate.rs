//! Translate a CSV file without sending anything

use anyhow::{Context, Result};
use eventloom_core::{Config, CsvSource, Importer, StdoutSink};

/// Run the translate command
pub async fn run(config_path: &str, csv: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    // The sink is never used; translate() only runs the translators
    let importer = Importer::from_config_with_sink(&config, Box::new(StdoutSink::new()))
        .context("Failed to load transforms")?;

    let source = CsvSource::open(csv, &importer.options().csv)
        .with_context(|| format!("Failed to open {}", csv))?;

    for (index, row) in source.enumerate() {
        let input = row?;
        let output = importer
            .translate(&input)
            .map_err(|e| e.at_row(csv, index + 1))?;
        println!("{}", serde_json::to_string(&output)?);
    }

    Ok(())
}
