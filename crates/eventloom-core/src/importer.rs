//! Import orchestration
//!
//! The [`Importer`] owns the translator list and a sink. Importing walks the
//! files in order and each file's rows in order: every row is translated and
//! pushed before the next row is read.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::reader::{CsvOptions, CsvSource};
use crate::record::{InputRecord, OutputRecord};
use crate::sink::RecordSink;
use crate::transform;
use crate::translator::Translator;

/// Import behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Fail on a missing input field or a blank typed value instead of
    /// writing null
    pub strict: bool,
    /// How source files are read
    pub csv: CsvOptions,
}

/// Counts from one import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Files fully processed
    pub files: usize,
    /// Records pushed to the sink
    pub records: usize,
}

/// Reads delimited files, translates each row and hands it to a sink
pub struct Importer {
    sink: Box<dyn RecordSink>,
    table_name: String,
    translators: Vec<Translator>,
    files: Vec<PathBuf>,
    options: ImportOptions,
}

impl Importer {
    /// Create an importer with no translators and no files
    pub fn new(sink: Box<dyn RecordSink>, table_name: impl Into<String>) -> Self {
        Self {
            sink,
            table_name: table_name.into(),
            translators: Vec::new(),
            files: Vec::new(),
            options: ImportOptions::default(),
        }
    }

    /// Set the files imported by [`Importer::import_configured`]
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Set import options
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Build an importer from a project config: its sink, every transform
    /// document in order, its files and its reader options.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sink = config.project.sink.build(&config.base_path)?;
        Self::from_config_with_sink(config, sink)
    }

    /// Like [`Importer::from_config`] but with a caller-provided sink
    pub fn from_config_with_sink(config: &Config, sink: Box<dyn RecordSink>) -> Result<Self> {
        let options = ImportOptions {
            strict: config.project.strict,
            csv: config.project.csv_options()?,
        };

        let mut importer = Self::new(sink, config.project.table.clone())
            .with_files(config.file_paths())
            .with_options(options);

        for path in config.transform_paths() {
            importer.load_transform_file(&path)?;
        }

        Ok(importer)
    }

    /// Parse a transform document and append its translators
    pub fn load_transform(&mut self, content: &str) -> Result<()> {
        let translators = transform::load_transform(content)?;
        self.translators.extend(translators);
        Ok(())
    }

    /// Read a transform document from disk and append its translators
    pub fn load_transform_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let translators = transform::load_transform_file(path)?;
        tracing::debug!(
            path = %path.display(),
            count = translators.len(),
            "loaded transform document"
        );
        self.translators.extend(translators);
        Ok(())
    }

    /// Translators in application order
    pub fn translators(&self) -> &[Translator] {
        &self.translators
    }

    /// Destination table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Configured files
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Import options in effect
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Apply every translator, in order, to a fresh output record
    pub fn translate(&self, input: &InputRecord) -> Result<OutputRecord> {
        let mut output = OutputRecord::new();
        for translator in &self.translators {
            translator.apply(input, &mut output, self.options.strict)?;
        }
        Ok(output)
    }

    /// Import the given files in order.
    ///
    /// Stops at the first failure; records already pushed stay pushed. Row
    /// failures carry the file and row they happened on.
    pub async fn import<I, P>(&mut self, files: I) -> Result<ImportStats>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut stats = ImportStats::default();

        for file in files {
            let path = file.as_ref();
            let source = CsvSource::open(path, &self.options.csv)?;
            tracing::debug!(path = %path.display(), headers = ?source.headers(), "opened source");

            let mut count = 0;
            for row in source {
                let input = row?;
                let row_number = count + 1;
                let output = self
                    .translate(&input)
                    .map_err(|e| e.at_row(path, row_number))?;
                self.sink
                    .push(&self.table_name, &output)
                    .await
                    .map_err(|e| e.at_row(path, row_number))?;
                count += 1;
            }

            self.sink.flush().await?;
            tracing::info!(path = %path.display(), records = count, "imported file");

            stats.files += 1;
            stats.records += count;
        }

        tracing::info!(
            table = %self.table_name,
            files = stats.files,
            records = stats.records,
            "import complete"
        );
        Ok(stats)
    }

    /// Import the configured files
    pub async fn import_configured(&mut self) -> Result<ImportStats> {
        let files = self.files.clone();
        self.import(&files).await
    }
}
