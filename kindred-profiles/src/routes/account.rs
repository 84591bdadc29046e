use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::middleware::ApiKeyAuth;
use kindred_shared::types::ApiResponse;

use crate::models::ProfileView;
use crate::services::profile_service::{self, ChangePasswordRequest, LoginRequest};
use crate::AppState;

pub async fn login(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let view = profile_service::login(state.store.as_ref(), req)?;
    Ok(Json(ApiResponse::ok(view)))
}

pub async fn change_password(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    profile_service::change_password(state.store.as_ref(), id, req)?;
    Ok(Json(ApiResponse::ok_with_message((), "password changed")))
}
