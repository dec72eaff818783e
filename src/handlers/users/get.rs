use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::UserView;
use crate::database::models::Role;
use crate::database::store::OrgStore;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// GET /api/users/:id - show a single user
pub async fn user_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .engine
        .store()
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Reads are company-scoped for everyone but the super admin.
    let permitted = match auth.role {
        Role::SuperAdmin => true,
        _ => auth.user_id == user.id || auth.company_id == user.company_id,
    };
    if !permitted {
        return Err(ApiError::forbidden("You are not allowed to view this user"));
    }

    Ok(Json(json!({
        "success": true,
        "user": UserView::from(user),
    })))
}

/// GET /api/users - list users in the caller's company
pub async fn user_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let users = state.engine.store().list_users(auth.company_id).await?;
    let count = users.len();
    let users: Vec<UserView> = users.into_iter().map(UserView::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": count,
        "users": users,
    })))
}
