//! Structured session logging
//!
//! This module provides the log sinks every monitor writes to:
//! - Structured entries with level, logger name and key/value fields
//! - A general stream and a separate sensitive stream (public addresses,
//!   session markers)
//! - Plain text or JSON rendering
//! - Append-only session files whose writes are serialized per line

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general monitoring information
    Info = 2,
    /// Warning level - degraded health, recovered failures
    Warn = 3,
    /// Error level - failures the monitor could not absorb silently
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            _ => Err(AppError::parse(format!("Invalid log format: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Local>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Session the entry belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Additional structured fields
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    pub fn new<S: Into<String>>(level: LogLevel, logger: &str, message: S) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
            logger: logger.to_string(),
            session_id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Look up a structured field
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Render the entry as a single line without the trailing newline
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Plain => self.format_plain(),
            LogFormat::Json => self.format_json(),
        }
    }

    fn format_plain(&self) -> String {
        let timestamp = self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let mut output = format!(
            "[{}] {:<5} [{}] {}",
            timestamp,
            self.level.as_str(),
            self.logger,
            self.message
        );

        if !self.fields.is_empty() {
            let fields_str: Vec<String> = self.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    fn format_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}", self.message),
        }
    }
}

/// Destination of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    General,
    Sensitive,
}

/// Append-only sink shared by every monitoring loop
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Append an entry to the general stream
    async fn write_general(&self, entry: LogEntry);

    /// Append an entry to the privacy-sensitive stream
    async fn write_sensitive(&self, entry: LogEntry);

    /// Flush and close both streams; later writes are dropped
    async fn close(&self) -> Result<()>;
}

/// Named handle used by a component to write into a shared recorder
#[derive(Clone)]
pub struct Logger {
    name: String,
    recorder: Arc<dyn Recorder>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: &str, recorder: Arc<dyn Recorder>) -> Self {
        Self { name: name.to_string(), recorder }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry::new(level, &self.name, message),
            stream: Stream::General,
        }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
    stream: Stream,
}

impl<'a> LogEntryBuilder<'a> {
    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Route the entry to the sensitive stream
    pub fn sensitive(mut self) -> Self {
        self.stream = Stream::Sensitive;
        self
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        match self.stream {
            Stream::General => self.logger.recorder.write_general(self.entry).await,
            Stream::Sensitive => self.logger.recorder.write_sensitive(self.entry).await,
        }
    }
}

/// Session log files on disk
pub struct FileRecorder {
    general: Mutex<Option<File>>,
    sensitive: Mutex<Option<File>>,
    general_path: PathBuf,
    sensitive_path: PathBuf,
    format: LogFormat,
    min_level: LogLevel,
    session_id: String,
    failed_writes: AtomicU64,
}

impl FileRecorder {
    /// Open (or create) today's general and sensitive log files in `dir`
    pub async fn open(dir: &Path, format: LogFormat, min_level: LogLevel) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await
            .map_err(|e| AppError::io(format!("Failed to create log directory {}: {}", dir.display(), e)))?;

        let date = Local::now().format("%Y-%m-%d");
        let general_path = dir.join(format!("network_logs_{}.txt", date));
        let sensitive_path = dir.join(format!("sensitive_logs_{}.txt", date));

        let general = open_append(&general_path).await?;
        let sensitive = open_append(&sensitive_path).await?;

        Ok(Self {
            general: Mutex::new(Some(general)),
            sensitive: Mutex::new(Some(sensitive)),
            general_path,
            sensitive_path,
            format,
            min_level,
            session_id: Uuid::new_v4().to_string(),
            failed_writes: AtomicU64::new(0),
        })
    }

    pub fn general_path(&self) -> &Path {
        &self.general_path
    }

    pub fn sensitive_path(&self) -> &Path {
        &self.sensitive_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Lines lost to failed writes since the session was opened
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    async fn append(&self, file: &Mutex<Option<File>>, path: &Path, mut entry: LogEntry) {
        if entry.session_id.is_none() {
            entry.session_id = Some(self.session_id.clone());
        }
        let mut line = entry.render(self.format);
        line.push('\n');

        // One write per line under the lock keeps lines from interleaving
        let mut guard = file.lock().await;
        if let Some(file) = guard.as_mut() {
            let written = match file.write_all(line.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                self.report_write_failure(path, &e);
            }
        }
    }

    /// Only the first failure reaches stderr, later ones are counted
    fn report_write_failure(&self, path: &Path, error: &io::Error) {
        if self.failed_writes.fetch_add(1, Ordering::Relaxed) == 0 {
            let _ = writeln!(
                io::stderr(),
                "Failed to write log file {}: {} (further write errors are not reported)",
                path.display(),
                error
            );
        }
    }
}

#[async_trait]
impl Recorder for FileRecorder {
    async fn write_general(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        self.append(&self.general, &self.general_path, entry).await;
    }

    async fn write_sensitive(&self, entry: LogEntry) {
        self.append(&self.sensitive, &self.sensitive_path, entry).await;
    }

    async fn close(&self) -> Result<()> {
        for slot in [&self.general, &self.sensitive] {
            if let Some(mut file) = slot.lock().await.take() {
                file.flush().await?;
                file.sync_all().await?;
            }
        }
        Ok(())
    }
}

async fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| AppError::io(format!("Failed to open log file {}: {}", path.display(), e)))
}

/// In-memory recorder keeping both streams for inspection
#[derive(Default)]
pub struct MemoryRecorder {
    general: std::sync::Mutex<Vec<LogEntry>>,
    sensitive: std::sync::Mutex<Vec<LogEntry>>,
    closed: std::sync::atomic::AtomicBool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn general_entries(&self) -> Vec<LogEntry> {
        self.general.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn sensitive_entries(&self) -> Vec<LogEntry> {
        self.sensitive.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Messages of the general stream, in write order
    pub fn general_messages(&self) -> Vec<String> {
        self.general_entries().into_iter().map(|e| e.message).collect()
    }

    /// Messages of the sensitive stream, in write order
    pub fn sensitive_messages(&self) -> Vec<String> {
        self.sensitive_entries().into_iter().map(|e| e.message).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn write_general(&self, entry: LogEntry) {
        if self.is_closed() {
            return;
        }
        if let Ok(mut general) = self.general.lock() {
            general.push(entry);
        }
    }

    async fn write_sensitive(&self, entry: LogEntry) {
        if self.is_closed() {
            return;
        }
        if let Ok(mut sensitive) = self.sensitive.lock() {
            sensitive.push(entry);
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
