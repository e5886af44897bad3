//! Append-only JSONL audit trail.
//!
//! One event per gateway decision, each line self-contained and written
//! atomically at the record level under a single writer lock. Events are
//! never mutated after emit.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Baseline;

/// Audit sink failures. Never swallowed: the gateway surfaces these to the
/// caller instead of defaulting to allow.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink could not be opened or written.
    #[error("audit sink io failure: {0}")]
    Io(#[from] std::io::Error),
    /// The event could not be serialized.
    #[error("audit event serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The writer lock was poisoned by a panicking writer.
    #[error("audit writer lock poisoned")]
    Poisoned,
}

/// One structured audit event per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Wall-clock seconds since the Unix epoch.
    pub ts: f64,
    /// Scenario id, when the request belongs to a benchmark run.
    pub scenario_id: Option<String>,
    /// Baseline active for the request.
    pub baseline: Baseline,
    /// Step index within the run.
    pub step: u32,
    /// Gateway-scoped request id.
    pub request_id: String,
    /// Run-scoped correlation id.
    pub correlation_id: String,
    /// Tool name as requested.
    pub tool: String,
    /// Arguments as seen at intake.
    pub args: serde_json::Value,
    /// Decision: `allowed`, `denied`, or `approval_required`.
    pub decision: String,
    /// Reason code for the decision.
    pub reason: String,
    /// Policy id active at gateway construction.
    pub policy_id: String,
    /// Policy version active at gateway construction.
    pub policy_version: String,
    /// Content hash of the policy sources; a changed hash implies a new
    /// process epoch.
    pub policy_hash: String,
    /// Numeric risk score computed for the request (0.0 when the request was
    /// rejected before risk analysis).
    pub risk_score: f64,
    /// Whether the decision holds the call for approval.
    pub requires_approval: bool,
    /// Latency from intake to just before emit, in milliseconds.
    pub latency_ms: f64,
    /// Effective canary flag, when taint analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_canary: Option<bool>,
    /// Snapshot of the policy input document, for B3 decisions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdp_input: Option<serde_json::Value>,
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Audit logger writing newline-delimited JSON to an append-only sink.
pub struct AuditLogger {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl AuditLogger {
    /// Create an audit logger that appends to the given file path, creating
    /// parent directories as needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Mutex::new(Box::new(file)),
        })
    }

    /// Create an audit logger over an arbitrary writer (for testing).
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Append one event as a single JSON line and flush.
    pub fn emit(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().map_err(|_| AuditError::Poisoned)?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    /// Shared buffer for capturing audit output in tests.
    #[derive(Clone)]
    pub(crate) struct SharedBuf(Arc<Mutex<Cursor<Vec<u8>>>>);

    impl SharedBuf {
        pub(crate) fn new() -> Self {
            Self(Arc::new(Mutex::new(Cursor::new(Vec::new()))))
        }

        pub(crate) fn contents(&self) -> String {
            let cursor = self.0.lock().expect("test lock");
            String::from_utf8_lossy(cursor.get_ref()).to_string()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("test lock").write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.0.lock().expect("test lock").flush()
        }
    }

    fn sample_event() -> AuditEvent {
        AuditEvent {
            ts: 1_700_000_000.5,
            scenario_id: Some("S1".to_owned()),
            baseline: Baseline::B3,
            step: 1,
            request_id: "req-abc".to_owned(),
            correlation_id: "run-xyz".to_owned(),
            tool: "http_get".to_owned(),
            args: serde_json::json!({"url": "https://api.company.tld/status"}),
            decision: "allowed".to_owned(),
            reason: "policy_allows".to_owned(),
            policy_id: "agent-policy".to_owned(),
            policy_version: "1.1.0".to_owned(),
            policy_hash: "deadbeef".to_owned(),
            risk_score: 0.85,
            requires_approval: false,
            latency_ms: 1.25,
            contains_canary: Some(false),
            pdp_input: None,
        }
    }

    #[test]
    fn test_emit_writes_one_json_line() {
        let buf = SharedBuf::new();
        let logger = AuditLogger::from_writer(Box::new(buf.clone()));
        logger.emit(&sample_event()).expect("emit");

        let output = buf.contents();
        let lines: Vec<&str> = output.trim().lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).expect("valid json");
        assert_eq!(value["decision"], "allowed");
        assert_eq!(value["correlation_id"], "run-xyz");
    }

    #[test]
    fn test_event_round_trips() {
        let event = sample_event();
        let line = serde_json::to_string(&event).expect("serialize");
        let back: AuditEvent = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_file_sink_appends(){
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("audit.jsonl");
        let logger = AuditLogger::new(&path).expect("open");
        logger.emit(&sample_event()).expect("emit 1");
        logger.emit(&sample_event()).expect("emit 2");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents.trim().lines().count(), 2);
    }
}
