use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{Role, UserStatus};

/// A user row.
///
/// `managed_manager_ids` is only populated for department heads;
/// `managed_member_ids` is populated for department heads (all members of
/// the department) and for managers (members whose `manager_id` is this
/// user). These sets are denormalized mirrors of the department graph and
/// are maintained exclusively by the role-transition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Display name, kept in sync with first/last name on update.
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub mobile_number: Option<String>,
    pub avatar: Option<String>,
    pub department_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub managed_manager_ids: Vec<Uuid>,
    pub managed_member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Recompute the display name from first/last parts.
    pub fn recompute_name(&mut self) {
        self.name = format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_user() -> User {
        User {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            first_name: String::new(),
            last_name: String::new(),
            name: String::new(),
            email: "x@example.com".into(),
            role: Role::Member,
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

    #[test]
    fn recomputes_display_name() {
        let mut user = blank_user();
        user.first_name = "Ada".into();
        user.last_name = "Lovelace".into();
        user.recompute_name();
        assert_eq!(user.name, "Ada Lovelace");

        user.last_name = String::new();
        user.recompute_name();
        assert_eq!(user.name, "Ada");
    }
}
