//! Eventloom Core Library
//!
//! This crate provides the core functionality for Eventloom:
//! - Transform documents and the field translators they define
//! - A small expression language for computed fields
//! - Delimited-text input
//! - Record sinks (stdout, JSON-lines file, HTTP event store)
//! - The importer that drives rows from files through translators to a sink
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV files  │────▶│ Translators │────▶│    Sink     │
//! │   (rows)    │     │ (transform) │     │  (records)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use eventloom_core::{Importer, StdoutSink};
//!
//! let mut importer = Importer::new(Box::new(StdoutSink::new()), "users");
//! importer.load_transform_file("transforms/users.yaml")?;
//! let stats = importer.import(["data/users.csv"]).await?;
//! println!("Imported {} records", stats.records);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod expression;
pub mod format;
pub mod importer;
pub mod reader;
pub mod record;
pub mod sink;
pub mod transform;
pub mod translator;

pub use config::{Config, ProjectConfig};
pub use error::{Error, Result};
pub use expression::{ExprError, Expression};
pub use format::FieldFormat;
pub use importer::{ImportOptions, ImportStats, Importer};
pub use reader::{CsvOptions, CsvSource};
pub use record::{InputRecord, OutputRecord};
pub use sink::{FileSink, HttpSink, MemorySink, RecordSink, SinkConfig, StdoutSink};
pub use transform::{load_transform, load_transform_file};
pub use translator::{Translator, TranslatorMode};
