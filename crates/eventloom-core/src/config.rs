//! Project configuration
//!
//! An import project is described by `eventloom.yaml`:
//!
//! ```yaml
//! name: users-import
//! table: users
//! transforms:
//!   - transforms/users.yaml
//! files:
//!   - data/users.csv
//! delimiter: ","
//! strict: false
//! sink:
//!   type: http
//!   url: "http://localhost:8585"
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::reader::CsvOptions;
use crate::sink::SinkConfig;

/// Default config file name inside a project directory
pub const CONFIG_FILE: &str = "eventloom.yaml";

/// Root project configuration from `eventloom.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Destination table handed to the sink with every record
    pub table: String,

    /// Transform documents, loaded and merged in order
    #[serde(default)]
    pub transforms: Vec<String>,

    /// Source files imported by default
    #[serde(default)]
    pub files: Vec<String>,

    /// Field delimiter of the source files
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Fail on a missing copied field or a blank typed value instead of
    /// writing null
    #[serde(default)]
    pub strict: bool,

    /// Where output records go
    #[serde(default)]
    pub sink: SinkConfig,
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl ProjectConfig {
    /// Reader options derived from this config
    pub fn csv_options(&self) -> Result<CsvOptions> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(CsvOptions {
                delimiter: c as u8,
                ..Default::default()
            }),
            _ => Err(Error::ConfigInvalid {
                message: format!(
                    "delimiter must be a single ASCII character, got '{}'",
                    self.delimiter
                ),
            }),
        }
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a config file path
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./users-import")?;
    /// println!("Importing into {}", config.project.table);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        project.csv_options()?;

        Ok(Self { project, base_path })
    }

    /// Resolve a path from the config against the project directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_path.join(path)
    }

    /// Transform document paths, resolved
    pub fn transform_paths(&self) -> Vec<PathBuf> {
        self.project
            .transforms
            .iter()
            .map(|p| self.resolve(p))
            .collect()
    }

    /// Source file paths, resolved
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.project.files.iter().map(|p| self.resolve(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: test-import
table: users
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-import");
        assert_eq!(config.table, "users");
        assert!(config.transforms.is_empty());
        assert!(config.files.is_empty());
        assert_eq!(config.delimiter, ",");
        assert!(!config.strict);
        assert_eq!(config.sink, SinkConfig::Stdout);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: test-import
table: users
transforms:
  - transforms/a.yaml
  - transforms/b.yaml
files:
  - data/users.csv
delimiter: ";"
strict: true
sink:
  type: file
  path: out/users.jsonl
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.transforms.len(), 2);
        assert_eq!(config.files, vec!["data/users.csv".to_string()]);
        assert!(config.strict);
        assert_eq!(config.csv_options().unwrap().delimiter, b';');
        assert!(matches!(config.sink, SinkConfig::File(_)));
    }

    #[test]
    fn test_tab_delimiter() {
        let config: ProjectConfig =
            serde_yaml::from_str("name: t\ntable: t\ndelimiter: \"\\t\"\n").unwrap();
        assert_eq!(config.csv_options().unwrap().delimiter, b'\t');
    }

    #[test]
    fn test_load_from_dir_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "name: t\ntable: events\ntransforms: [t.yaml]\nfiles: [data/a.csv]\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.transform_paths(), vec![dir.path().join("t.yaml")]);
        assert_eq!(config.file_paths(), vec![dir.path().join("data/a.csv")]);
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_bad_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "name: t\ntable: t\ndelimiter: \"||\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }
}
