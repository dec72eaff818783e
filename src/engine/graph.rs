// engine/graph.rs - working copy of the org graph touched by one update

use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::database::models::{Department, Role, User};

/// Which denormalized reference set an edge lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// `managed_manager_ids` on a department head.
    ManagedManager,
    /// `managed_member_ids` on a department head or manager.
    ManagedMember,
}

/// In-memory working copy of every row a single update may touch.
///
/// The planner mutates this copy through the edge primitives below; rows are
/// keyed by id, so the same entity loaded under two relationships (say, a
/// member whose manager is also the department head) is edited exactly once.
/// Nothing here talks to storage - `into_writes` hands the dirty rows back
/// for the session to persist atomically.
#[derive(Debug)]
pub struct OrgGraph {
    target_id: Uuid,
    users: BTreeMap<Uuid, User>,
    departments: BTreeMap<Uuid, Department>,
    dirty_users: BTreeSet<Uuid>,
    dirty_departments: BTreeSet<Uuid>,
    /// Users whose `manager_id` must be nulled via update-many; these rows
    /// are intentionally not loaded individually.
    clear_manager_of: Vec<Uuid>,
}

/// Dirty rows produced by planning, ready to persist.
#[derive(Debug)]
pub struct GraphWrites {
    pub target: User,
    pub users: Vec<User>,
    pub departments: Vec<Department>,
    pub clear_manager_of: Vec<Uuid>,
}

impl OrgGraph {
    pub fn new(target: User) -> Self {
        let target_id = target.id;
        let mut users = BTreeMap::new();
        users.insert(target_id, target);
        Self {
            target_id,
            users,
            departments: BTreeMap::new(),
            dirty_users: BTreeSet::new(),
            dirty_departments: BTreeSet::new(),
            clear_manager_of: Vec::new(),
        }
    }

    pub fn target_id(&self) -> Uuid {
        self.target_id
    }

    pub fn insert_user(&mut self, user: Option<User>) {
        if let Some(user) = user {
            self.users.entry(user.id).or_insert(user);
        }
    }

    pub fn insert_department(&mut self, department: Option<Department>) {
        if let Some(department) = department {
            self.departments.entry(department.id).or_insert(department);
        }
    }

    pub fn target(&self) -> &User {
        &self.users[&self.target_id]
    }

    pub fn target_mut(&mut self) -> &mut User {
        self.dirty_users.insert(self.target_id);
        self.users.get_mut(&self.target_id).expect("target row present")
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        let user = self.users.get_mut(&id)?;
        self.dirty_users.insert(id);
        Some(user)
    }

    pub fn department(&self, id: Uuid) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn department_mut(&mut self, id: Uuid) -> Option<&mut Department> {
        let department = self.departments.get_mut(&id)?;
        self.dirty_departments.insert(id);
        Some(department)
    }

    /// Current head of a department among the loaded rows, optionally
    /// excluding one user id.
    pub fn head_of(&self, department_id: Uuid, exclude: Option<Uuid>) -> Option<Uuid> {
        self.users
            .values()
            .find(|u| {
                u.role == Role::DepartmentHead
                    && u.department_id == Some(department_id)
                    && Some(u.id) != exclude
            })
            .map(|u| u.id)
    }

    // --- edge primitives -------------------------------------------------

    /// Remove `report` from a supervisor's managed set.
    pub fn detach_report(&mut self, supervisor: Uuid, report: Uuid, kind: EdgeKind) {
        if let Some(user) = self.user_mut(supervisor) {
            let set = match kind {
                EdgeKind::ManagedManager => &mut user.managed_manager_ids,
                EdgeKind::ManagedMember => &mut user.managed_member_ids,
            };
            pull(set, report);
        }
    }

    /// Add `report` to a supervisor's managed set, deduplicated.
    pub fn attach_report(&mut self, supervisor: Uuid, report: Uuid, kind: EdgeKind) {
        if let Some(user) = self.user_mut(supervisor) {
            let set = match kind {
                EdgeKind::ManagedManager => &mut user.managed_manager_ids,
                EdgeKind::ManagedMember => &mut user.managed_member_ids,
            };
            push_unique(set, report);
        }
    }

    /// Move a report edge between supervisors. Either side may be absent
    /// (a department without a head contributes no edge).
    pub fn move_edge(&mut self, from: Option<Uuid>, to: Option<Uuid>, report: Uuid, kind: EdgeKind) {
        if let Some(from) = from {
            self.detach_report(from, report, kind);
        }
        if let Some(to) = to {
            self.attach_report(to, report, kind);
        }
    }

    /// Drop a user from a department's rosters (both `member_ids` and
    /// `manager_ids`; a correct row only ever lists them in one).
    pub fn detach_from_rosters(&mut self, department_id: Uuid, user_id: Uuid) {
        if let Some(department) = self.department_mut(department_id) {
            pull(&mut department.member_ids, user_id);
            pull(&mut department.manager_ids, user_id);
        }
    }

    /// Detach the target user from every relationship their *current*
    /// role/department/manager implies. Shared cleanup step for promotions
    /// and department moves.
    pub fn detach_target_from_current_position(&mut self) {
        let target = self.target().clone();
        let Some(department_id) = target.department_id else {
            return;
        };

        match target.role {
            Role::Member => {
                self.detach_from_rosters(department_id, target.id);
                if let Some(head) = self.head_of(department_id, Some(target.id)) {
                    self.detach_report(head, target.id, EdgeKind::ManagedMember);
                }
                if let Some(manager) = target.manager_id {
                    self.detach_report(manager, target.id, EdgeKind::ManagedMember);
                }
            }
            Role::Manager => {
                self.detach_from_rosters(department_id, target.id);
                if let Some(head) = self.head_of(department_id, Some(target.id)) {
                    self.detach_report(head, target.id, EdgeKind::ManagedManager);
                }
            }
            Role::DepartmentHead => {
                // A sitting head's position is the headship itself.
                if let Some(department) = self.department_mut(department_id) {
                    if department.head_id == Some(target.id) {
                        department.head_id = None;
                    }
                }
            }
            _ => {}
        }
    }

    /// List a manager in a department's `manager_ids` roster.
    pub fn attach_manager_roster(&mut self, department_id: Uuid, user_id: Uuid) {
        if let Some(department) = self.department_mut(department_id) {
            push_unique(&mut department.manager_ids, user_id);
        }
    }

    /// List an unmanaged member in a department's `member_ids` roster.
    pub fn attach_member_roster(&mut self, department_id: Uuid, user_id: Uuid) {
        if let Some(department) = self.department_mut(department_id) {
            push_unique(&mut department.member_ids, user_id);
        }
    }

    /// Schedule an update-many that nulls `manager_id` on these users.
    pub fn schedule_manager_clear(&mut self, member_ids: &[Uuid]) {
        for id in member_ids {
            push_unique(&mut self.clear_manager_of, *id);
        }
    }

    pub fn into_writes(mut self) -> GraphWrites {
        let target = self.users.remove(&self.target_id).expect("target row present");
        let dirty_users = std::mem::take(&mut self.dirty_users);
        let dirty_departments = std::mem::take(&mut self.dirty_departments);
        GraphWrites {
            target,
            users: self
                .users
                .into_iter()
                .filter(|(id, _)| dirty_users.contains(id))
                .map(|(_, user)| user)
                .collect(),
            departments: self
                .departments
                .into_iter()
                .filter(|(id, _)| dirty_departments.contains(id))
                .map(|(_, department)| department)
                .collect(),
            clear_manager_of: self.clear_manager_of,
        }
    }
}

fn pull(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    ids.len() != before
}

fn push_unique(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    if ids.contains(&id) {
        return false;
    }
    ids.push(id);
    true
}
