// engine/transition.rs - classification of role/department change patterns

use uuid::Uuid;

use super::changes::Changes;
use super::error::EngineError;
use super::graph::OrgGraph;
use crate::database::models::Role;

/// The six mutually exclusive transition patterns, plus the fall-through.
///
/// Dispatch is a state machine over (old role, effective new role,
/// department change); classification picks the first matching case in
/// priority order and planning applies exactly that case's graph edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// A non-head user becomes head of `department`.
    PromoteToHead { department: Uuid },
    /// A sitting head takes over headship of `department` from someone else.
    HeadToHead { department: Uuid },
    /// A sitting head steps down to `to`.
    HeadDemotion { to: Role },
    /// A manager moves between departments.
    ManagerMove { from: Uuid, to: Uuid },
    /// A member moves between departments.
    MemberMove { from: Uuid, to: Uuid },
    /// Plain field update with no graph side effects.
    FieldsOnly,
}

impl TransitionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransitionKind::PromoteToHead { .. } => "promote_to_head",
            TransitionKind::HeadToHead { .. } => "head_to_head",
            TransitionKind::HeadDemotion { .. } => "head_demotion",
            TransitionKind::ManagerMove { .. } => "manager_move",
            TransitionKind::MemberMove { .. } => "member_move",
            TransitionKind::FieldsOnly => "fields_only",
        }
    }

    pub fn is_transition(&self) -> bool {
        !matches!(self, TransitionKind::FieldsOnly)
    }
}

/// Decide which transition case applies, first match wins.
///
/// Precondition (enforced by the engine before classification): when the
/// requested role is `department_head`, the destination department exists
/// and is loaded into the graph.
pub fn classify(graph: &OrgGraph, changes: &Changes) -> Result<TransitionKind, EngineError> {
    let target = graph.target();
    let effective = changes.effective_role(target.role);
    let department_after = changes.department_id.resolve(target.department_id);

    // Headship assignment: the request explicitly assigns it. An omitted role
    // field never re-seats a head, even if the department row disagrees.
    if changes.role == Some(Role::DepartmentHead) {
        let Some(department) = department_after else {
            return Err(EngineError::Validation(
                "Department ID is required when assigning department head role".into(),
            ));
        };
        if target.role != Role::DepartmentHead {
            return Ok(TransitionKind::PromoteToHead { department });
        }
        // Sitting head: re-asserting headship of the same department is a
        // no-op; anything else re-seats the head.
        let already_head = target.department_id == Some(department)
            && graph
                .department(department)
                .map_or(false, |d| d.head_id == Some(target.id));
        if already_head {
            return Ok(TransitionKind::FieldsOnly);
        }
        return Ok(TransitionKind::HeadToHead { department });
    }

    // A sitting head steps down.
    if target.role == Role::DepartmentHead
        && changes.role.map_or(false, |r| r != Role::DepartmentHead)
    {
        return Ok(TransitionKind::HeadDemotion { to: effective });
    }

    // A manager or member changes department.
    if matches!(target.role, Role::Manager | Role::Member)
        && effective == target.role
        && department_after != target.department_id
    {
        let (Some(from), Some(to)) = (target.department_id, department_after) else {
            return Err(EngineError::DomainRule(format!(
                "Both old and new department IDs are required for a {} department change",
                target.role
            )));
        };
        return Ok(match target.role {
            Role::Manager => TransitionKind::ManagerMove { from, to },
            _ => TransitionKind::MemberMove { from, to },
        });
    }

    Ok(TransitionKind::FieldsOnly)
}
