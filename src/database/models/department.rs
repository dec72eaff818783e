use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A department row.
///
/// `member_ids` only lists members with no assigned manager (members with a
/// manager hang off that manager's `managed_member_ids` instead). A user id
/// appears in at most one of `head_id`, `manager_ids` or `member_ids`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub head_id: Option<Uuid>,
    pub manager_ids: Vec<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
