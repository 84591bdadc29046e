use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::middleware::ApiKeyAuth;
use kindred_shared::types::{ApiResponse, Created};

use crate::models::{ProfileView, User};
use crate::services::profile_service::{self, CreateUserRequest, CreatedUser, UpdateProfileRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DeletedUser {
    pub user_id: i32,
}

// --- GET /users ---

pub async fn list_users(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = profile_service::list_users(state.store.as_ref())?;
    Ok(Json(ApiResponse::ok(users)))
}

// --- POST /users ---

pub async fn create_user(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Created<CreatedUser>> {
    let created = profile_service::create_user(state.store.as_ref(), req)?;
    Ok(Created(ApiResponse::ok_with_message(created, "user created")))
}

// --- GET /users/:id ---

pub async fn get_user(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let view = profile_service::get_profile(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(view)))
}

// --- PATCH /users/:id ---

pub async fn update_user(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let view = profile_service::update_profile(state.store.as_ref(), id, req)?;
    Ok(Json(ApiResponse::ok_with_message(view, "profile updated")))
}

// --- DELETE /users/:id ---

pub async fn delete_user(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<DeletedUser>>> {
    profile_service::delete_user(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok_with_message(DeletedUser { user_id: id }, "user deleted")))
}
