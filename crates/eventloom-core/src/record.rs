//! Input and output records
//!
//! An [`InputRecord`] is one row of delimited text keyed by the header row.
//! An [`OutputRecord`] is the JSON object built by the translators and handed
//! to a sink.

use serde_json::{Map, Value};

/// Output record: field name to converted value, in translator order
pub type OutputRecord = Map<String, Value>;

/// One input row as an ordered mapping from header name to raw value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecord {
    fields: Vec<(String, String)>,
}

impl InputRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from header/value pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Look up the raw value of a field.
    ///
    /// Duplicate headers resolve to the first column with that name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(header, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render the record as a JSON object of strings
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (k, v) in &self.fields {
            obj.entry(k.clone())
                .or_insert_with(|| Value::String(v.clone()));
        }
        Value::Object(obj)
    }
}
