// Audit emission: transitions produce exactly one event after commit, plain
// field updates produce none. Sinks are swappable through the engine.

mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::json;

use common::{admin_caller, company, dept, person, MemStore};
use orghub_api_rust::database::models::Role;
use orghub_api_rust::engine::{
    AuditSink, RoleTransitionEngine, TransitionEvent, UpdateUserRequest,
};

/// Captures every recorded event for assertions.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<TransitionEvent>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &TransitionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn req(body: serde_json::Value) -> UpdateUserRequest {
    serde_json::from_value(body).expect("valid request body")
}

#[tokio::test]
async fn promotion_records_one_audit_event() -> Result<()> {
    let co = company();
    let mut d = dept(co, "Engineering");
    let mut head = person(co, Role::DepartmentHead, Some(d.id));
    let mut manager = person(co, Role::Manager, Some(d.id));
    d.head_id = Some(head.id);
    d.manager_ids = vec![manager.id];
    manager.manager_id = Some(head.id);
    head.managed_manager_ids = vec![manager.id];

    let store = MemStore::new(vec![head.clone(), manager.clone()], vec![d.clone()]);
    let sink = Arc::new(RecordingSink::default());
    let engine = RoleTransitionEngine::with_audit_sink(store, sink.clone());

    let caller = admin_caller(co);
    engine
        .apply_update(
            &caller,
            manager.id,
            req(json!({ "role": "department_head", "departmentId": d.id })),
        )
        .await?;

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.user_id, manager.id);
    assert_eq!(event.actor_id, caller.user_id);
    assert_eq!(event.kind, "promote_to_head");
    assert_eq!(event.to_department, Some(d.id));
    assert_eq!(event.displaced_head, Some(head.id));
    Ok(())
}

#[tokio::test]
async fn plain_field_update_records_nothing() -> Result<()> {
    let co = company();
    let member = person(co, Role::Member, None);

    let store = MemStore::new(vec![member.clone()], vec![]);
    let sink = Arc::new(RecordingSink::default());
    let engine = RoleTransitionEngine::with_audit_sink(store, sink.clone());

    let outcome = engine
        .apply_update(
            &admin_caller(co),
            member.id,
            req(json!({ "firstName": "Robin" })),
        )
        .await?;

    assert!(!outcome.transitioned);
    assert!(sink.events.lock().unwrap().is_empty());
    Ok(())
}
