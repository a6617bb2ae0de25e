//! Delimited-text input
//!
//! [`CsvSource`] opens one file, reads its header row and yields one
//! [`InputRecord`] per data row. The file handle lives inside the source and
//! is closed when the source is dropped, whether the rows ran out or an error
//! stopped the import early.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use crate::error::{Error, Result};
use crate::record::InputRecord;

/// Options for reading delimited files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Trim surrounding whitespace from header names
    pub trim_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim_headers: true,
        }
    }
}

/// Row iterator over one delimited file
pub struct CsvSource {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: Vec<String>,
    row: usize,
    buf: StringRecord,
}

impl CsvSource {
    /// Open a file and read its header row
    pub fn open(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::FileAccess {
            path: path.clone(),
            source,
        })?;

        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| Error::Csv(e).at_row(&path, 0))?
            .iter()
            .map(|h| {
                if options.trim_headers {
                    h.trim().to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        Ok(Self {
            path,
            reader,
            headers,
            row: 0,
            buf: StringRecord::new(),
        })
    }

    /// Header names, in column order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Path this source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows read so far
    pub fn rows_read(&self) -> usize {
        self.row
    }
}

impl Iterator for CsvSource {
    type Item = Result<InputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.buf) {
            Ok(false) => None,
            Ok(true) => {
                self.row += 1;
                let record =
                    InputRecord::from_pairs(self.headers.iter().cloned().zip(self.buf.iter()));
                Some(Ok(record))
            }
            Err(e) => {
                self.row += 1;
                Some(Err(Error::Csv(e).at_row(&self.path, self.row)))
            }
        }
    }
}
