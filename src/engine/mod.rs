// engine/mod.rs - role-transition engine: validate, authorize, classify,
// plan, persist atomically

pub mod audit;
pub mod changes;
pub mod error;
pub mod graph;
pub mod plan;
pub mod transition;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Role, User};
use crate::database::store::{OrgSession, OrgStore};

pub use audit::{AuditSink, NullAuditSink, TracingAuditSink, TransitionEvent};
pub use changes::{Changes, RefChange, UpdateUserRequest};
pub use error::EngineError;
pub use plan::Plan;
pub use transition::TransitionKind;

/// The authenticated principal performing an update.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub company_id: Uuid,
}

/// What an update produced: the user's final state and whether one of the
/// structural transition cases fired.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub user: User,
    pub transitioned: bool,
}

/// Applies profile updates while keeping the department/head/manager graph
/// consistent. All reads and writes for one update share a single session;
/// any error before commit rolls the whole thing back.
pub struct RoleTransitionEngine<S: OrgStore> {
    store: S,
    audit: Arc<dyn AuditSink>,
}

impl<S: OrgStore> RoleTransitionEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(store: S, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn apply_update(
        &self,
        caller: &Caller,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UpdateOutcome, EngineError> {
        let changes = request.validate()?;

        let mut session = self.store.begin().await?;
        match stage(session.as_mut(), caller, user_id, &changes).await {
            Ok(plan) => {
                session.commit().await?;
                let transitioned = plan.kind.is_transition();
                if transitioned {
                    self.audit.record(&TransitionEvent {
                        user_id: plan.writes.target.id,
                        company_id: plan.writes.target.company_id,
                        actor_id: caller.user_id,
                        kind: plan.kind.label(),
                        from_department: plan.from_department,
                        to_department: plan.to_department,
                        displaced_head: plan.displaced_head,
                        cleared_reports: plan.writes.clear_manager_of.len(),
                        at: Utc::now(),
                    });
                }
                Ok(UpdateOutcome {
                    user: plan.writes.target,
                    transitioned,
                })
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Everything between `begin` and `commit`: load, authorize, classify,
/// plan, and write the staged rows into the session.
async fn stage(
    session: &mut dyn OrgSession,
    caller: &Caller,
    user_id: Uuid,
    changes: &Changes,
) -> Result<plan::Plan, EngineError> {
    let target = session
        .find_user(user_id)
        .await?
        .ok_or_else(|| EngineError::NotFound("User not found".into()))?;

    authorize(caller, &target, changes)?;

    if let Some(email) = &changes.email {
        if *email != target.email
            && session.find_user_by_email(email, target.id).await?.is_some()
        {
            return Err(EngineError::Conflict(
                "Email is already in use by another user".into(),
            ));
        }
    }

    let department_after = changes.department_id.resolve(target.department_id);
    if changes.role == Some(Role::DepartmentHead) && department_after.is_none() {
        return Err(EngineError::Validation(
            "Department ID is required when assigning department head role".into(),
        ));
    }

    let mut graph = graph::OrgGraph::new(target.clone());

    // Destination department. The row must exist whenever the update is
    // actually pointing the user at it.
    if let Some(department_id) = department_after {
        let department = session.find_department(department_id).await?;
        match &department {
            Some(department) => {
                if !caller.role.is_admin()
                    && department.company_id != caller.company_id
                    && department_after != target.department_id
                {
                    return Err(EngineError::Authorization(
                        "You cannot move into a department of another company".into(),
                    ));
                }
            }
            None => {
                if changes.role == Some(Role::DepartmentHead)
                    || department_after != target.department_id
                {
                    return Err(EngineError::NotFound(
                        "The specified department does not exist".into(),
                    ));
                }
            }
        }
        graph.insert_department(department);
        graph.insert_user(session.find_department_head(department_id, Some(user_id)).await?);
    }

    // Current department and its head, for the cleanup side of a move.
    if let Some(department_id) = target.department_id {
        if graph.department(department_id).is_none() {
            graph.insert_department(session.find_department(department_id).await?);
            graph.insert_user(
                session
                    .find_department_head(department_id, Some(user_id))
                    .await?,
            );
        }
    }

    // Requested manager must exist and be able to take reports.
    if let RefChange::Set(manager_id) = changes.manager_id {
        if manager_id == user_id {
            return Err(EngineError::DomainRule(
                "A user cannot be their own manager".into(),
            ));
        }
        let manager = session
            .find_user(manager_id)
            .await?
            .filter(|m| m.role.can_manage_reports())
            .ok_or_else(|| {
                EngineError::Validation(
                    "Manager must be an existing user with a manager or department head role"
                        .into(),
                )
            })?;
        graph.insert_user(Some(manager));
    }

    // Current manager row, for edge cleanup on moves.
    if let Some(manager_id) = target.manager_id {
        if graph.user(manager_id).is_none() {
            graph.insert_user(session.find_user(manager_id).await?);
        }
    }

    let kind = transition::classify(&graph, changes)?;
    let mut plan = plan::plan_update(graph, changes, kind)?;

    plan.writes.target.updated_at = Utc::now();
    for department in &plan.writes.departments {
        session.save_department(department).await?;
    }
    for user in &plan.writes.users {
        session.save_user(user).await?;
    }
    session.save_user(&plan.writes.target).await?;
    if !plan.writes.clear_manager_of.is_empty() {
        session
            .clear_manager_for_members(&plan.writes.clear_manager_of)
            .await?;
    }

    Ok(plan)
}

fn authorize(caller: &Caller, target: &User, changes: &Changes) -> Result<(), EngineError> {
    if caller.role == Role::SuperAdmin {
        return Ok(());
    }
    if caller.role == Role::Admin {
        if caller.company_id != target.company_id {
            return Err(EngineError::Authorization(
                "You cannot manage users outside your company".into(),
            ));
        }
        return Ok(());
    }
    if caller.user_id != target.id {
        return Err(EngineError::Authorization(
            "You are not allowed to update this user".into(),
        ));
    }
    if changes.role.is_some() {
        return Err(EngineError::Authorization(
            "You are not allowed to change your own role".into(),
        ));
    }
    if changes.company_id.map_or(false, |c| c != target.company_id) {
        return Err(EngineError::Authorization(
            "You are not allowed to change your company".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserStatus;

    fn user(id: Uuid, role: Role, company_id: Uuid) -> User {
        User {
            id,
            company_id,
            first_name: "Test".into(),
            last_name: "User".into(),
            name: "Test User".into(),
            email: format!("{}@example.com", id),
            role,
            status: UserStatus::Active,
            phone: None,
            mobile_number: None,
            avatar: None,
            department_id: None,
            manager_id: None,
            managed_manager_ids: vec![],
            managed_member_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn no_changes() -> Changes {
        Changes {
            first_name: None,
            last_name: None,
            email: None,
            role: None,
            company_id: None,
            department_id: RefChange::Keep,
            manager_id: RefChange::Keep,
            hod_id: RefChange::Keep,
            phone: None,
            mobile_number: None,
            status: None,
        }
    }

    #[test]
    fn super_admin_may_update_any_company() {
        let target = user(Uuid::new_v4(), Role::Member, Uuid::new_v4());
        let caller = Caller {
            user_id: Uuid::new_v4(),
            role: Role::SuperAdmin,
            company_id: Uuid::new_v4(),
        };
        assert!(authorize(&caller, &target, &no_changes()).is_ok());
    }

    #[test]
    fn admin_is_scoped_to_their_company() {
        let company = Uuid::new_v4();
        let target = user(Uuid::new_v4(), Role::Member, company);
        let same = Caller {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            company_id: company,
        };
        let other = Caller {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            company_id: Uuid::new_v4(),
        };
        assert!(authorize(&same, &target, &no_changes()).is_ok());
        assert!(matches!(
            authorize(&other, &target, &no_changes()),
            Err(EngineError::Authorization(_))
        ));
    }

    #[test]
    fn user_may_update_self_but_not_role() {
        let company = Uuid::new_v4();
        let target = user(Uuid::new_v4(), Role::Member, company);
        let caller = Caller {
            user_id: target.id,
            role: Role::Member,
            company_id: company,
        };

        let mut plain = no_changes();
        plain.first_name = Some("New".into());
        assert!(authorize(&caller, &target, &plain).is_ok());

        let mut escalation = no_changes();
        escalation.role = Some(Role::Admin);
        assert!(matches!(
            authorize(&caller, &target, &escalation),
            Err(EngineError::Authorization(_))
        ));
    }

    #[test]
    fn user_may_not_update_someone_else() {
        let company = Uuid::new_v4();
        let target = user(Uuid::new_v4(), Role::Member, company);
        let caller = Caller {
            user_id: Uuid::new_v4(),
            role: Role::Manager,
            company_id: company,
        };
        assert!(matches!(
            authorize(&caller, &target, &no_changes()),
            Err(EngineError::Authorization(_))
        ));
    }
}
