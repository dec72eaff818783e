use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::Role;

/// JWT claims this service accepts. Tokens are issued elsewhere; the
/// middleware only decodes and validates them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub company_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}
