// tests/common/mod.rs - in-memory store and fixtures for engine tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use orghub_api_rust::database::models::{Department, Role, User, UserStatus};
use orghub_api_rust::database::store::{OrgSession, OrgStore, StoreError};
use orghub_api_rust::engine::Caller;

#[derive(Debug, Clone, Default)]
pub struct MemState {
    pub users: HashMap<Uuid, User>,
    pub departments: HashMap<Uuid, Department>,
}

/// In-memory `OrgStore` with transactional sessions: every session works
/// on a private copy of the state and publishes it only on commit, so a
/// failed update leaves the shared state untouched.
#[derive(Clone)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
    /// When set, the Nth write in a session fails (0 = first write).
    fail_on_write: Option<usize>,
}

impl MemStore {
    pub fn new(users: Vec<User>, departments: Vec<Department>) -> Self {
        let state = MemState {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            departments: departments.into_iter().map(|d| (d.id, d)).collect(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            fail_on_write: None,
        }
    }

    pub fn failing_on_write(mut self, nth: usize) -> Self {
        self.fail_on_write = Some(nth);
        self
    }

    pub fn user(&self, id: Uuid) -> User {
        self.state.lock().unwrap().users[&id].clone()
    }

    pub fn department(&self, id: Uuid) -> Department {
        self.state.lock().unwrap().departments[&id].clone()
    }
}

#[async_trait]
impl OrgStore for MemStore {
    async fn begin(&self) -> Result<Box<dyn OrgSession>, StoreError> {
        let staged = self.state.lock().unwrap().clone();
        Ok(Box::new(MemSession {
            staged,
            shared: Arc::clone(&self.state),
            fail_on_write: self.fail_on_write,
            writes: 0,
        }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().unwrap().users.get(&id).cloned())
    }

    async fn list_users(&self, company_id: Uuid) -> Result<Vec<User>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.company_id == company_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

pub struct MemSession {
    staged: MemState,
    shared: Arc<Mutex<MemState>>,
    fail_on_write: Option<usize>,
    writes: usize,
}

impl MemSession {
    fn check_write(&mut self) -> Result<(), StoreError> {
        if self.fail_on_write == Some(self.writes) {
            return Err(StoreError::Corrupt("injected write failure".into()));
        }
        self.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl OrgSession for MemSession {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &mut self,
        email: &str,
        exclude: Uuid,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.email == email && u.id != exclude)
            .cloned())
    }

    async fn find_department(&mut self, id: Uuid) -> Result<Option<Department>, StoreError> {
        Ok(self.staged.departments.get(&id).cloned())
    }

    async fn find_department_head(
        &mut self,
        department_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| {
                u.role == Role::DepartmentHead
                    && u.department_id == Some(department_id)
                    && Some(u.id) != exclude
            })
            .cloned())
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.check_write()?;
        self.staged.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_department(&mut self, department: &Department) -> Result<(), StoreError> {
        self.check_write()?;
        self.staged.departments.insert(department.id, department.clone());
        Ok(())
    }

    async fn clear_manager_for_members(&mut self, member_ids: &[Uuid]) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut cleared = 0;
        for id in member_ids {
            if let Some(user) = self.staged.users.get_mut(id) {
                user.manager_id = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        *self.shared.lock().unwrap() = self.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

// --- fixtures ------------------------------------------------------------

pub fn company() -> Uuid {
    Uuid::new_v4()
}

pub fn person(company_id: Uuid, role: Role, department_id: Option<Uuid>) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        company_id,
        first_name: "Alex".into(),
        last_name: "Kim".into(),
        name: "Alex Kim".into(),
        email: format!("{}@example.com", id),
        role,
        status: UserStatus::Active,
        phone: None,
        mobile_number: None,
        avatar: None,
        department_id,
        manager_id: None,
        managed_manager_ids: vec![],
        managed_member_ids: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn dept(company_id: Uuid, name: &str) -> Department {
    Department {
        id: Uuid::new_v4(),
        company_id,
        name: name.into(),
        head_id: None,
        manager_ids: vec![],
        member_ids: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn admin_caller(company_id: Uuid) -> Caller {
    Caller {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
        company_id,
    }
}
