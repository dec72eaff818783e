// engine/audit.rs - structured audit events for role transitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One audit event per matched transition case, emitted after commit.
///
/// Emission is a collaborator concern, not part of the engine contract:
/// a failed sink never fails the update.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionEvent {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub actor_id: Uuid,
    pub kind: &'static str,
    pub from_department: Option<Uuid>,
    pub to_department: Option<Uuid>,
    /// Head displaced (and demoted to member) by this transition, if any.
    pub displaced_head: Option<Uuid>,
    /// Number of reports whose manager reference was cleared in bulk.
    pub cleared_reports: usize,
    pub at: DateTime<Utc>,
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &TransitionEvent);
}

/// Sink used when audit logging is disabled in configuration.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &TransitionEvent) {}
}

/// Default sink: one structured tracing record per event.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &TransitionEvent) {
        tracing::info!(
            target: "audit",
            user = %event.user_id,
            actor = %event.actor_id,
            kind = event.kind,
            from_department = ?event.from_department,
            to_department = ?event.to_department,
            displaced_head = ?event.displaced_head,
            cleared_reports = event.cleared_reports,
            "role transition applied"
        );
    }
}
