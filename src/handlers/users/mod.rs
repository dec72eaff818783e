// handlers/users/mod.rs - user endpoints

pub mod get;
pub mod update;

pub use get::{user_get, user_list};
pub use update::user_update;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{Role, User, UserStatus};

/// API shape of a user row. `department` mirrors `departmentId` because
/// older clients read one or the other.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Alias of `company_id` kept for client compatibility.
    pub company: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub mobile_number: Option<String>,
    pub avatar: Option<String>,
    pub department_id: Option<Uuid>,
    pub department: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub managed_manager_ids: Vec<Uuid>,
    pub managed_member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            company_id: user.company_id,
            company: user.company_id,
            first_name: user.first_name,
            last_name: user.last_name,
            name: user.name,
            email: user.email,
            role: user.role,
            status: user.status,
            phone: user.phone,
            mobile_number: user.mobile_number,
            avatar: user.avatar,
            department_id: user.department_id,
            department: user.department_id,
            manager_id: user.manager_id,
            managed_manager_ids: user.managed_manager_ids,
            managed_member_ids: user.managed_member_ids,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
