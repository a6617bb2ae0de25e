//! Record sinks
//!
//! A sink is the sender side of an import: it receives every finished output
//! record together with the destination table name. Delivery semantics belong
//! to the sink; the importer awaits each push before reading the next row.

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::OutputRecord;

/// Trait for record destinations
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Deliver one record to `table`
    async fn push(&mut self, table: &str, record: &OutputRecord) -> Result<()>;

    /// Flush any buffered records
    async fn flush(&mut self) -> Result<()>;
}

/// Sink configuration from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Print records to stdout as JSON lines
    #[default]
    Stdout,

    /// Write records to a JSON-lines file
    File(FileSinkConfig),

    /// Send records to an HTTP event endpoint
    Http(HttpSinkConfig),
}

/// File sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Output path, relative paths resolve against the project directory
    pub path: String,
}

/// HTTP sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    /// Event store base URL. Records go to `{url}/tables/{table}/events`.
    /// A URL that already contains `{table}` is used as the full endpoint,
    /// with the placeholder replaced by the table name.
    pub url: String,

    /// HTTP method
    #[serde(default = "default_http_method")]
    pub method: String,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_http_method() -> String {
    "POST".to_string()
}

impl SinkConfig {
    /// Build the configured sink
    pub fn build(&self, base_path: &Path) -> Result<Box<dyn RecordSink>> {
        Ok(match self {
            SinkConfig::Stdout => Box::new(StdoutSink::new()),
            SinkConfig::File(f) => Box::new(FileSink::new(base_path.join(&f.path))),
            SinkConfig::Http(h) => Box::new(HttpSink::new(h.clone())?),
        })
    }
}

// ============================================================================
// Stdout
// ============================================================================

/// Prints each record as one JSON line on stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Create a new stdout sink
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordSink for StdoutSink {
    async fn push(&mut self, _table: &str, record: &OutputRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

/// Writes records to a JSON-lines file, created on first push
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<std::fs::File>>,
}

impl FileSink {
    /// Create a new file sink
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    fn ensure_writer(&mut self) -> Result<&mut BufWriter<std::fs::File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(&self.path).map_err(|source| Error::FileAccess {
                path: self.path.clone(),
                source,
            })?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer.as_mut().ok_or_else(|| Error::Sink {
            sink: "file".to_string(),
            message: "writer not initialized".to_string(),
        })
    }
}

#[async_trait]
impl RecordSink for FileSink {
    async fn push(&mut self, _table: &str, record: &OutputRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let writer = self.ensure_writer()?;
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Sends each record as a JSON request body to an event endpoint
pub struct HttpSink {
    client: reqwest::Client,
    config: HttpSinkConfig,
    method: reqwest::Method,
}

impl HttpSink {
    /// Create a new HTTP sink
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let method = reqwest::Method::from_bytes(config.method.to_uppercase().as_bytes())
            .map_err(|_| Error::ConfigInvalid {
                message: format!("invalid HTTP method '{}'", config.method),
            })?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            method,
        })
    }

    fn url_for(&self, table: &str) -> String {
        let url = &self.config.url;
        if url.contains("{table}") {
            url.replace("{table}", table)
        } else {
            format!("{}/tables/{}/events", url.trim_end_matches('/'), table)
        }
    }
}

#[async_trait]
impl RecordSink for HttpSink {
    async fn push(&mut self, table: &str, record: &OutputRecord) -> Result<()> {
        let url = self.url_for(table);
        let mut request = self.client.request(self.method.clone(), &url).json(record);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| Error::Sink {
            sink: "http".to_string(),
            message: format!("request to {} failed: {}", url, e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Sink {
                sink: "http".to_string(),
                message: format!("{} returned {}: {}", url, status, body),
            });
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Collects records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<(String, OutputRecord)>>>,
}

impl MemorySink {
    /// Create an empty memory sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(table, record)` pairs received so far
    pub fn records(&self) -> Vec<(String, OutputRecord)> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of records received
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing was received
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn push(&mut self, table: &str, record: &OutputRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((table.to_string(), record.clone()));
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Json, Path as UrlPath, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::{Value, json};

    fn record(value: Value) -> OutputRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    type Received = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    async fn receive(
        State(received): State<Received>,
        UrlPath(table): UrlPath<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        let token = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        received.lock().unwrap().push((table, token, body));
        StatusCode::CREATED
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_stdout_sink() {
        let config: SinkConfig = serde_yaml::from_str("type: stdout\n").unwrap();
        assert_eq!(config, SinkConfig::Stdout);
    }

    #[test]
    fn test_parse_http_sink_defaults() {
        let yaml = r#"
type: http
url: "http://localhost:8585/tables/{table}/events"
"#;
        let config: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        match config {
            SinkConfig::Http(h) => {
                assert_eq!(h.method, "POST");
                assert!(h.headers.is_empty());
            }
            other => panic!("Expected http sink, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_sink() {
        let config: SinkConfig =
            serde_yaml::from_str("type: file\npath: out/events.jsonl\n").unwrap();
        assert_eq!(
            config,
            SinkConfig::File(FileSinkConfig {
                path: "out/events.jsonl".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_http_method() {
        let result = HttpSink::new(HttpSinkConfig {
            url: "http://localhost".to_string(),
            method: "NOT A METHOD".to_string(),
            headers: HashMap::new(),
        });
        assert!(matches!(result, Err(Error::ConfigInvalid { .. })));
    }

    #[tokio::test]
    async fn test_file_sink_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.jsonl");
        let mut sink = FileSink::new(&path);

        sink.push("events", &record(json!({"x": 1}))).await.unwrap();
        sink.push("events", &record(json!({"x": 2}))).await.unwrap();
        sink.flush().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![json!({"x": 1}), json!({"x": 2})]);
    }

    #[tokio::test]
    async fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();
        handle.push("t", &record(json!({"a": "b"}))).await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].0, "t");
    }

    #[tokio::test]
    async fn test_http_sink_posts_records() {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/tables/{table}/events", post(receive))
            .with_state(received.clone());
        let base = serve(app).await;

        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), "secret".to_string());
        let mut sink = HttpSink::new(HttpSinkConfig {
            url: format!("{}/tables/{{table}}/events", base),
            method: "post".to_string(),
            headers,
        })
        .unwrap();

        sink.push("users", &record(json!({"id": 42}))).await.unwrap();
        sink.flush().await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "users");
        assert_eq!(received[0].1.as_deref(), Some("secret"));
        assert_eq!(received[0].2, json!({"id": 42}));
    }

    #[tokio::test]
    async fn test_http_sink_appends_events_path_to_base_url() {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/tables/{table}/events", post(receive))
            .with_state(received.clone());
        let base = serve(app).await;

        let mut sink = HttpSink::new(HttpSinkConfig {
            url: format!("{}/", base),
            method: default_http_method(),
            headers: HashMap::new(),
        })
        .unwrap();

        sink.push("orders", &record(json!({"id": 7}))).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "orders");
        assert_eq!(received[0].2, json!({"id": 7}));
    }

    #[test]
    fn test_url_for() {
        let sink = |url: &str| {
            HttpSink::new(HttpSinkConfig {
                url: url.to_string(),
                method: default_http_method(),
                headers: HashMap::new(),
            })
            .unwrap()
        };
        assert_eq!(
            sink("http://store:8585").url_for("users"),
            "http://store:8585/tables/users/events"
        );
        assert_eq!(
            sink("http://store:8585/v2/{table}").url_for("users"),
            "http://store:8585/v2/users"
        );
    }

    #[tokio::test]
    async fn test_http_sink_rejects_error_status() {
        let app = Router::new().route(
            "/tables/{table}/events",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "store offline") }),
        );
        let base = serve(app).await;

        let mut sink = HttpSink::new(HttpSinkConfig {
            url: base,
            method: "POST".to_string(),
            headers: HashMap::new(),
        })
        .unwrap();

        let err = sink
            .push("users", &record(json!({"id": 1})))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("store offline"));
    }
}
