// database/store.rs - transactional store seam over the users/departments tables

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Department, Role, User, UserStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored enum column held a value the application doesn't know.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Entry point for storage access. `begin` opens a transactional session;
/// the read methods run outside any transaction.
#[async_trait]
pub trait OrgStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn OrgSession>, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn list_users(&self, company_id: Uuid) -> Result<Vec<User>, StoreError>;
}

/// One atomic unit of work. Every mutation made through a session is
/// either committed as a whole or discarded; dropping a session without
/// calling `commit` rolls it back.
#[async_trait]
pub trait OrgSession: Send {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Look up another user holding this email, excluding `exclude`.
    async fn find_user_by_email(
        &mut self,
        email: &str,
        exclude: Uuid,
    ) -> Result<Option<User>, StoreError>;

    /// Load a department row, locking it for the duration of the session.
    async fn find_department(&mut self, id: Uuid) -> Result<Option<Department>, StoreError>;

    /// Current head of a department, optionally excluding one user id.
    /// The head row is locked for the duration of the session.
    async fn find_department_head(
        &mut self,
        department_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>, StoreError>;

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError>;

    async fn save_department(&mut self, department: &Department) -> Result<(), StoreError>;

    /// Null out `manager_id` on every listed user (update-many).
    async fn clear_manager_for_members(&mut self, member_ids: &[Uuid]) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, company_id, first_name, last_name, name, email, role, status, \
     phone, mobile_number, avatar, department_id, manager_id, \
     managed_manager_ids, managed_member_ids, created_at, updated_at";

const DEPARTMENT_COLUMNS: &str =
    "id, company_id, name, head_id, manager_ids, member_ids, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    Ok(User {
        id: row.get("id"),
        company_id: row.get("company_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        name: row.get("name"),
        email: row.get("email"),
        role: role
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        status: status
            .parse::<UserStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        phone: row.get("phone"),
        mobile_number: row.get("mobile_number"),
        avatar: row.get("avatar"),
        department_id: row.get("department_id"),
        manager_id: row.get("manager_id"),
        managed_manager_ids: row.get("managed_manager_ids"),
        managed_member_ids: row.get("managed_member_ids"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn department_from_row(row: &PgRow) -> Result<Department, StoreError> {
    Ok(Department {
        id: row.get("id"),
        company_id: row.get("company_id"),
        name: row.get("name"),
        head_id: row.get("head_id"),
        manager_ids: row.get("manager_ids"),
        member_ids: row.get("member_ids"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// Session reads of the department and its head take row locks, so two
// concurrent role transitions touching the same department serialize on
// that row instead of both reading "no competing head" and committing.
fn locked_department_sql() -> String {
    format!(
        "SELECT {} FROM departments WHERE id = $1 FOR UPDATE",
        DEPARTMENT_COLUMNS
    )
}

fn locked_department_head_sql() -> String {
    format!(
        "SELECT {} FROM users WHERE role = 'department_head' AND department_id = $1 \
         AND ($2::uuid IS NULL OR id <> $2) FOR UPDATE",
        USER_COLUMNS
    )
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrgStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn OrgSession>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self, company_id: Uuid) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE company_id = $1 ORDER BY name",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(company_id).fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }
}

struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrgSession for PgSession {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(
        &mut self,
        email: &str,
        exclude: Uuid,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1) AND id <> $2",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .bind(exclude)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_department(&mut self, id: Uuid) -> Result<Option<Department>, StoreError> {
        let row = sqlx::query(&locked_department_sql())
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(department_from_row).transpose()
    }

    async fn find_department_head(
        &mut self,
        department_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&locked_department_head_sql())
            .bind(department_id)
            .bind(exclude)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET \
                 company_id = $2, first_name = $3, last_name = $4, name = $5, \
                 email = $6, role = $7, status = $8, phone = $9, mobile_number = $10, \
                 avatar = $11, department_id = $12, manager_id = $13, \
                 managed_manager_ids = $14, managed_member_ids = $15, updated_at = now() \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(user.company_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(&user.phone)
        .bind(&user.mobile_number)
        .bind(&user.avatar)
        .bind(user.department_id)
        .bind(user.manager_id)
        .bind(&user.managed_manager_ids)
        .bind(&user.managed_member_ids)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_department(&mut self, department: &Department) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE departments SET \
                 name = $2, head_id = $3, manager_ids = $4, member_ids = $5, updated_at = now() \
             WHERE id = $1",
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(department.head_id)
        .bind(&department.manager_ids)
        .bind(&department.member_ids)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn clear_manager_for_members(&mut self, member_ids: &[Uuid]) -> Result<u64, StoreError> {
        if member_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE users SET manager_id = NULL, updated_at = now() WHERE id = ANY($1)",
        )
        .bind(member_ids)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
