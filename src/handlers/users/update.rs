use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::UserView;
use crate::engine::UpdateUserRequest;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// PUT /api/users/:id - update a user, running the role-transition engine
/// when the change touches the reporting graph
pub async fn user_update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.engine.apply_update(&auth.caller(), id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "user": UserView::from(outcome.user),
        "roleChangeProcessed": outcome.transitioned,
    })))
}
