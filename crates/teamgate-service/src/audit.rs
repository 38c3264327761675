//! Audit records for privileged operations.
//!
//! An operation opens an [`AuditScope`] before touching any state. The scope
//! starts out as a failure and is flushed to the configured [`AuditSink`]
//! exactly once, when it is dropped, whichever return path the operation
//! took. Only an explicit [`AuditScope::mark_success`] on the success path
//! turns the outcome into a success.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use serde::Serialize;

use crate::authz::ActorContext;
use crate::config::AuditConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Fail,
    Success,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Fail => f.write_str("fail"),
            AuditStatus::Success => f.write_str("success"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub action: &'static str,
    pub status: AuditStatus,
    pub actor: ActorContext,
    pub meta: IndexMap<String, serde_json::Value>,
}

impl AuditRecord {
    fn new(action: &'static str, actor: ActorContext) -> Self {
        Self {
            action,
            status: AuditStatus::Fail,
            actor,
            meta: IndexMap::new(),
        }
    }

    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditSinkError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for finalized audit records.
///
/// Emission is best-effort: errors are logged by the caller and never reach
/// the business operation.
pub trait AuditSink: Send + Sync {
    fn emit(&self, record: &AuditRecord) -> Result<(), AuditSinkError>;
}

/// Writes each record as a structured `tracing` event on target `audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        let meta = serde_json::to_string(&record.meta)?;
        match record.status {
            AuditStatus::Success => tracing::info!(
                target: "audit",
                event = "audit_record",
                action = record.action,
                status = %record.status,
                actor = %record.actor,
                session_id = record.actor.session_id.as_deref().unwrap_or(""),
                client_addr = record.actor.client_addr.as_deref().unwrap_or(""),
                meta = %meta,
                "privileged operation succeeded"
            ),
            AuditStatus::Fail => tracing::warn!(
                target: "audit",
                event = "audit_record",
                action = record.action,
                status = %record.status,
                actor = %record.actor,
                session_id = record.actor.session_id.as_deref().unwrap_or(""),
                client_addr = record.actor.client_addr.as_deref().unwrap_or(""),
                meta = %meta,
                "privileged operation failed"
            ),
        }
        Ok(())
    }
}

/// Keeps finalized records in memory, in flush order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        self.records
            .lock()
            .map_err(|e| AuditSinkError::Unavailable(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}

/// Opens audit scopes against a shared sink.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    activity_log: bool,
}

impl fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("activity_log", &self.activity_log)
            .finish_non_exhaustive()
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new(Arc::new(TracingAuditSink))
    }
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            activity_log: true,
        }
    }

    pub fn from_config(config: &AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            activity_log: config.activity_log,
        }
    }

    pub fn open(&self, action: &'static str, actor: &ActorContext) -> AuditScope {
        AuditScope {
            record: Some(AuditRecord::new(action, actor.clone())),
            sink: Arc::clone(&self.sink),
            activity_log: self.activity_log,
        }
    }
}

/// One in-flight audit record; flushed when dropped.
#[must_use = "dropping the scope immediately records a failed operation"]
pub struct AuditScope {
    record: Option<AuditRecord>,
    sink: Arc<dyn AuditSink>,
    activity_log: bool,
}

impl AuditScope {
    /// Attaches `value` under `key`; an existing entry keeps its position and
    /// has its value replaced.
    pub fn add_meta<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let Some(record) = self.record.as_mut() else {
            return;
        };
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    action = record.action,
                    key,
                    error = %e,
                    "unserializable audit metadata"
                );
                serde_json::Value::Null
            }
        };
        record.meta.insert(key.to_string(), value);
    }

    pub fn mark_success(&mut self) {
        if let Some(record) = self.record.as_mut() {
            record.status = AuditStatus::Success;
        }
    }

    pub fn status(&self) -> AuditStatus {
        self.record
            .as_ref()
            .map_or(AuditStatus::Fail, |r| r.status)
    }

    pub fn record(&self) -> Option<&AuditRecord> {
        self.record.as_ref()
    }

    /// Emits a human-readable activity line next to the structured record.
    pub fn log_activity(&self, detail: &str) {
        if !self.activity_log {
            return;
        }
        if let Some(record) = self.record.as_ref() {
            tracing::info!(
                target: "audit",
                event = "activity",
                action = record.action,
                actor = %record.actor,
                "{detail}"
            );
        }
    }

    fn flush(&mut self) {
        let Some(record) = self.record.take() else {
            return;
        };
        if let Err(e) = self.sink.emit(&record) {
            tracing::warn!(
                action = record.action,
                status = %record.status,
                error = %e,
                "failed to emit audit record"
            );
        }
    }
}

impl fmt::Debug for AuditScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditScope")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        self.flush();
    }
}
