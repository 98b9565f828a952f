//! Structured evidence log for harness runs.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record per scenario or soak run.
//! - [`LogEmitter`]: writes JSONL lines to a file, stdout, or a shared buffer.
//! - [`validate_log_line`]: checks a JSONL line against the required fields.
//! - [`sha256_hex`]: digest used to pin captured dumps.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use canarystack_membrane::Status;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Scenario outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Canonical evidence record.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_bits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// SHA-256 of the dump captured for this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            mode: None,
            scenario: None,
            status_bits: None,
            status_labels: None,
            outcome: None,
            dump_sha256: None,
            duration_us: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Record a status as raw bits plus labels.
    #[must_use]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status_bits = Some(status.bits());
        self.status_labels = Some(status.labels().into_iter().map(String::from).collect());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Pin a captured dump by digest.
    #[must_use]
    pub fn with_dump(mut self, dump: &str) -> Self {
        self.dump_sha256 = Some(sha256_hex(dump.as_bytes()));
        self
    }

    #[must_use]
    pub fn with_duration_us(mut self, us: u64) -> Self {
        self.duration_us = Some(us);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Writes JSONL entries with sequential trace ids.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    run_id: String,
}

impl LogEmitter {
    /// Emitter writing to a new file at `path`.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(
            Box::new(std::io::BufWriter::new(file)),
            run_id,
        ))
    }

    /// Emitter writing to stdout.
    #[must_use]
    pub fn to_stdout(run_id: &str) -> Self {
        Self::to_writer(Box::new(std::io::stdout()), run_id)
    }

    /// Emitter writing to an in-memory buffer readable through the returned handle.
    #[must_use]
    pub fn to_buffer(run_id: &str) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::to_writer(Box::new(buffer.clone()), run_id), buffer)
    }

    #[must_use]
    pub fn to_writer(writer: Box<dyn Write>, run_id: &str) -> Self {
        Self {
            writer,
            seq: 0,
            run_id: run_id.to_string(),
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("canarystack::{}::{:03}", self.run_id, self.seq)
    }

    /// Emit an entry; an empty `trace_id` is filled in.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<LogEntry> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        let line = entry.to_jsonl().map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        Ok(entry)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// A field-level schema violation in one JSONL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate one JSONL line.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let error = |field: &str, message: String| LogValidationError {
        line_number,
        field: field.to_string(),
        message,
    };

    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| vec![error("<json>", format!("invalid JSON: {e}"))])?;
    let Some(obj) = value.as_object() else {
        return Err(vec![error("<root>", "expected JSON object".to_string())]);
    };

    let mut errors: Vec<_> = ["timestamp", "trace_id", "level", "event"]
        .into_iter()
        .filter(|field| !obj.contains_key(*field))
        .map(|field| error(field, "required field missing".to_string()))
        .collect();
    if let Some(digest) = obj.get("dump_sha256").and_then(|v| v.as_str()) {
        if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            errors.push(error("dump_sha256", "expected 64 hex digits".to_string()));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(value).map_err(|e| vec![error("<schema>", e.to_string())])
}

/// Lowercase hex SHA-256.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}Z", duration.as_secs(), duration.subsec_millis())
}

/// Cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("t::1", LogLevel::Info, "scenario_result");
        let line = entry.to_jsonl().unwrap();
        let parsed = validate_log_line(&line, 1).unwrap();
        assert_eq!(parsed.event, "scenario_result");
        assert!(!line.contains("dump_sha256"));
    }

    #[test]
    fn status_is_recorded_with_labels() {
        let entry = LogEntry::new("t::1", LogLevel::Warn, "x")
            .with_status(Status::LEFT_DATA_CANARY | Status::BAD_DATA_HASH);
        assert_eq!(entry.status_labels.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            entry.status_bits,
            Some((Status::LEFT_DATA_CANARY | Status::BAD_DATA_HASH).bits())
        );
    }

    #[test]
    fn emitter_assigns_sequential_trace_ids() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("run1");
        emitter
            .emit_entry(LogEntry::new("", LogLevel::Info, "a"))
            .unwrap();
        emitter
            .emit_entry(LogEntry::new("", LogLevel::Info, "b"))
            .unwrap();
        let text = buffer.contents();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("canarystack::run1::001"));
        assert!(lines[1].contains("canarystack::run1::002"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let errs = validate_log_line(r#"{"timestamp":"0","level":"info"}"#, 3).unwrap_err();
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["trace_id", "event"]);
        assert_eq!(errs[0].line_number, 3);
    }

    #[test]
    fn bad_digest_is_reported() {
        let line = r#"{"timestamp":"0","trace_id":"t","level":"info","event":"e","dump_sha256":"xyz"}"#;
        let errs = validate_log_line(line, 1).unwrap_err();
        assert_eq!(errs[0].field, "dump_sha256");
    }

    #[test]
    fn sha256_matches_reference_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
