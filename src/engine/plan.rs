// engine/plan.rs - per-case graph edits, computed purely on the working copy

use uuid::Uuid;

use super::changes::{Changes, RefChange};
use super::error::EngineError;
use super::graph::{EdgeKind, GraphWrites, OrgGraph};
use super::transition::TransitionKind;
use crate::database::models::{Role, User};

/// The full set of row mutations one update produces. `writes.target` is
/// the user's final state; everything is persisted in a single session.
#[derive(Debug)]
pub struct Plan {
    pub writes: GraphWrites,
    pub kind: TransitionKind,
    pub from_department: Option<Uuid>,
    pub to_department: Option<Uuid>,
    pub displaced_head: Option<Uuid>,
}

/// Apply the matched case's graph edits, then the direct field update.
/// Pure: consumes the working copy and produces writes, never touching
/// storage.
pub fn plan_update(
    mut graph: OrgGraph,
    changes: &Changes,
    kind: TransitionKind,
) -> Result<Plan, EngineError> {
    let from_department = graph.target().department_id;
    let mut displaced_head = None;

    match kind {
        TransitionKind::PromoteToHead { department }
        | TransitionKind::HeadToHead { department } => {
            displaced_head = seat_head(&mut graph, department)?;
        }
        TransitionKind::HeadDemotion { to } => demote_head(&mut graph, to, changes),
        TransitionKind::ManagerMove { from, to } => move_manager(&mut graph, from, to, changes)?,
        TransitionKind::MemberMove { from, to } => move_member(&mut graph, from, to, changes)?,
        TransitionKind::FieldsOnly => {
            let target = graph.target_mut();
            if let Some(role) = changes.role {
                target.role = role;
            }
            target.department_id = changes.department_id.resolve(target.department_id);
            target.manager_id = changes.manager_id.resolve(target.manager_id);
        }
    }

    apply_scalar_fields(graph.target_mut(), changes);
    let to_department = graph.target().department_id;

    Ok(Plan {
        writes: graph.into_writes(),
        kind,
        from_department,
        to_department,
        displaced_head,
    })
}

/// Promotion or head-to-head transfer: make the target head of `department`.
///
/// Cleanup of the prior position, transfer of the displaced head's managed
/// sets, demotion of the displaced head, and seating are one sequence for
/// both cases; they differ only in what the cleanup step finds.
fn seat_head(graph: &mut OrgGraph, department: Uuid) -> Result<Option<Uuid>, EngineError> {
    let target_id = graph.target_id();

    // A manager becoming head stops managing their old reports directly;
    // those rows get their manager reference cleared in bulk.
    let former_reports = if graph.target().role == Role::Manager {
        graph.target().managed_member_ids.clone()
    } else {
        Vec::new()
    };

    graph.detach_target_from_current_position();

    // Transfer the displaced head's managed sets (self excluded), then
    // demote them to member with every reference cleared.
    let displaced = graph.head_of(department, Some(target_id));
    let mut managers = Vec::new();
    let mut members = Vec::new();
    if let Some(displaced_id) = displaced {
        if let Some(old_head) = graph.user(displaced_id) {
            managers = dedup_excluding(&old_head.managed_manager_ids, target_id);
            members = dedup_excluding(&old_head.managed_member_ids, target_id);
        }
        if let Some(old_head) = graph.user_mut(displaced_id) {
            old_head.role = Role::Member;
            old_head.department_id = None;
            old_head.manager_id = None;
            old_head.managed_manager_ids.clear();
            old_head.managed_member_ids.clear();
        }
    }

    graph.schedule_manager_clear(&former_reports);

    {
        let target = graph.target_mut();
        target.role = Role::DepartmentHead;
        target.department_id = Some(department);
        // Heads report to no one.
        target.manager_id = None;
        target.managed_manager_ids = managers;
        target.managed_member_ids = members;
    }

    // The new head must not linger in the destination rosters.
    graph.detach_from_rosters(department, target_id);
    let dept = graph
        .department_mut(department)
        .ok_or_else(|| EngineError::NotFound("The specified department does not exist".into()))?;
    dept.head_id = Some(target_id);

    Ok(displaced)
}

/// A sitting head steps down to `to`.
fn demote_head(graph: &mut OrgGraph, to: Role, changes: &Changes) {
    let target_id = graph.target_id();
    let old_department = graph.target().department_id;

    if let Some(department_id) = old_department {
        if let Some(department) = graph.department_mut(department_id) {
            if department.head_id == Some(target_id) {
                department.head_id = None;
            }
        }
    }

    // Demotion to manager re-homes the user under another head of the same
    // department, when one exists. Demotion to member never auto-assigns.
    let successor = if to == Role::Manager {
        old_department.and_then(|d| graph.head_of(d, Some(target_id)))
    } else {
        None
    };

    let target = graph.target_mut();
    target.role = to;
    target.managed_manager_ids.clear();
    target.managed_member_ids.clear();
    target.department_id = changes.department_id.resolve(target.department_id);
    target.manager_id = match successor {
        Some(head) => Some(head),
        None => changes.manager_id.resolve(target.manager_id),
    };
}

/// A manager changes department.
fn move_manager(
    graph: &mut OrgGraph,
    from: Uuid,
    to: Uuid,
    changes: &Changes,
) -> Result<(), EngineError> {
    let target_id = graph.target_id();

    // A manager cannot be assigned to a headless department.
    let new_head = graph.head_of(to, None).ok_or_else(|| {
        EngineError::DomainRule(format!("No department head found for department {}", to))
    })?;
    let old_head = graph.head_of(from, Some(target_id));

    graph.move_edge(old_head, Some(new_head), target_id, EdgeKind::ManagedManager);
    graph.detach_from_rosters(from, target_id);
    graph.attach_manager_roster(to, target_id);

    let target = graph.target_mut();
    target.department_id = Some(to);
    // Without an explicit manager the mover reports to the destination head;
    // carrying the old department's head across would leave a dangling edge.
    target.manager_id = match changes.manager_id {
        RefChange::Set(m) => Some(m),
        RefChange::Clear => None,
        RefChange::Keep => Some(new_head),
    };
    Ok(())
}

/// A member changes department.
fn move_member(
    graph: &mut OrgGraph,
    from: Uuid,
    to: Uuid,
    changes: &Changes,
) -> Result<(), EngineError> {
    let target_id = graph.target_id();

    let new_head = graph.head_of(to, None).ok_or_else(|| {
        EngineError::DomainRule(format!("No department head found for department {}", to))
    })?;
    let old_head = graph.head_of(from, Some(target_id));
    let old_manager = graph.target().manager_id;

    // Out of the old department's relationships...
    graph.move_edge(old_head, Some(new_head), target_id, EdgeKind::ManagedMember);
    if let Some(manager) = old_manager {
        graph.detach_report(manager, target_id, EdgeKind::ManagedMember);
    }
    graph.detach_from_rosters(from, target_id);

    // ...and into the new ones. Without an explicit manager the member
    // reports directly to the head and lands in the member roster.
    let new_manager = match changes.manager_id {
        RefChange::Set(manager) => Some(manager),
        RefChange::Keep | RefChange::Clear => None,
    };
    match new_manager {
        Some(manager) => graph.attach_report(manager, target_id, EdgeKind::ManagedMember),
        None => graph.attach_member_roster(to, target_id),
    }

    let target = graph.target_mut();
    target.department_id = Some(to);
    target.manager_id = new_manager;
    Ok(())
}

/// Non-structural fields, applied uniformly after the case edits.
fn apply_scalar_fields(user: &mut User, changes: &Changes) {
    let name_changed = changes.first_name.is_some() || changes.last_name.is_some();
    if let Some(first_name) = &changes.first_name {
        user.first_name = first_name.clone();
    }
    if let Some(last_name) = &changes.last_name {
        user.last_name = last_name.clone();
    }
    if name_changed {
        user.recompute_name();
    }
    if let Some(email) = &changes.email {
        user.email = email.clone();
    }
    if let Some(phone) = &changes.phone {
        user.phone = phone.clone();
    }
    if let Some(mobile_number) = &changes.mobile_number {
        user.mobile_number = mobile_number.clone();
    }
    if let Some(status) = changes.status {
        user.status = status;
    }
    if let Some(company_id) = changes.company_id {
        user.company_id = company_id;
    }
}

fn dedup_excluding(ids: &[Uuid], exclude: Uuid) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if *id != exclude && !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
