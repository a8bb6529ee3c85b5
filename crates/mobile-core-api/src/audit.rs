// crates/mobile-core-api/src/audit.rs
// ============================================================================
// Module: API Audit Logging
// Description: Structured audit events for the gate and app lifecycle.
// Purpose: Emit JSON-line audit records without leaking credentials.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. Bearer tokens are
//! never recorded; gate events carry a SHA-256 fingerprint instead so repeated
//! use of one token can be correlated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Access gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Caller was checked and allowed.
    Allow,
    /// Route is exempt from the check.
    Exempt,
    /// Caller was rejected.
    Deny,
}

/// App lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// App creation.
    Create,
    /// App update.
    Update,
    /// App deletion.
    Delete,
    /// Registry reconciliation.
    Reconcile,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Access gate audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Gate decision.
    pub decision: GateDecision,
    /// Response status when the gate answered itself.
    pub status: Option<u16>,
    /// Failure reason for deny events.
    pub reason: Option<String>,
    /// Checked user for allow events.
    pub username: Option<String>,
    /// Bearer token fingerprint (sha256).
    pub token_fingerprint: Option<String>,
}

impl GateAuditEvent {
    /// Builds an event for `method` and `path`.
    #[must_use]
    pub fn new(method: &str, path: &str, decision: GateDecision) -> Self {
        Self {
            event: "access_gate",
            timestamp_ms: now_ms(),
            method: method.to_string(),
            path: path.to_string(),
            decision,
            status: None,
            reason: None,
            username: None,
            token_fingerprint: None,
        }
    }

    /// Returns the event with the status and reason of a rejection.
    #[must_use]
    pub fn rejected(mut self, status: u16, reason: impl Into<String>) -> Self {
        self.status = Some(status);
        self.reason = Some(reason.into());
        self
    }

    /// Returns the event with the caller's token fingerprint.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token_fingerprint = Some(token_fingerprint(token));
        self
    }

    /// Returns the event with the checked username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// App lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Lifecycle action.
    pub action: LifecycleAction,
    /// App identifier when known.
    pub app_id: Option<String>,
    /// Outcome label (`ok` or `error`).
    pub outcome: &'static str,
    /// Error text for failed actions.
    pub error: Option<String>,
}

impl LifecycleAuditEvent {
    /// Builds a successful lifecycle event.
    #[must_use]
    pub fn ok(action: LifecycleAction, app_id: Option<String>) -> Self {
        Self {
            event: "app_lifecycle",
            timestamp_ms: now_ms(),
            action,
            app_id,
            outcome: "ok",
            error: None,
        }
    }

    /// Builds a failed lifecycle event.
    #[must_use]
    pub fn failed(
        action: LifecycleAction,
        app_id: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            event: "app_lifecycle",
            timestamp_ms: now_ms(),
            action,
            app_id,
            outcome: "error",
            error: Some(error.into()),
        }
    }
}

/// Security posture audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl SecurityAuditEvent {
    /// Builds a security event.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event: "security_audit",
            timestamp_ms: now_ms(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for API events.
pub trait AuditSink: Send + Sync {
    /// Records an access gate event.
    fn record_gate(&self, event: &GateAuditEvent);

    /// Records an app lifecycle event.
    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}

    /// Records a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event.
    fn write(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_gate(&self, event: &GateAuditEvent) {
        Self::write(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        Self::write(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        Self::write(event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn write(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_gate(&self, event: &GateAuditEvent) {
        self.write(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.write(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.write(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_gate(&self, _event: &GateAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the lowercase hex SHA-256 fingerprint of `token`.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Current wall-clock time in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::AuditSink;
    use super::FileAuditSink;
    use super::GateAuditEvent;
    use super::GateDecision;
    use super::token_fingerprint;

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            token_fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_sink_appends_json_lines_without_raw_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        let event = GateAuditEvent::new("GET", "/apps", GateDecision::Deny)
            .rejected(401, "token rejected")
            .with_token("super-secret-token");
        sink.record_gate(&event);
        sink.record_gate(&event);
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!content.contains("super-secret-token"));
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["decision"], "deny");
        assert_eq!(value["status"], 401);
    }
}
