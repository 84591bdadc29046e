use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::middleware::ApiKeyAuth;
use kindred_shared::types::{ApiResponse, Created};

use crate::models::ProfileView;
use crate::services::match_engine;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub source_id: i32,
    pub target_id: i32,
}

/// POST /likes - 201 for a new edge, 200 when it already existed.
pub async fn send_like(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LikeRequest>,
) -> AppResult<Response> {
    let outcome = match_engine::like(
        state.store.as_ref(),
        req.source_id,
        req.target_id,
        Utc::now().date_naive(),
    )?;

    if outcome.created {
        Ok(Created(ApiResponse::ok_with_message(outcome, "like recorded")).into_response())
    } else {
        Ok(Json(ApiResponse::ok_with_message(outcome, "already liked")).into_response())
    }
}

pub async fn explore(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<ProfileView>>>> {
    let views = match_engine::explore(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(views)))
}

pub async fn liked_me(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<ProfileView>>>> {
    let views = match_engine::liked_me(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(views)))
}

pub async fn my_likes(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<ProfileView>>>> {
    let views = match_engine::my_likes(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(views)))
}

pub async fn matches(
    _auth: ApiKeyAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<ProfileView>>>> {
    let views = match_engine::matches(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(views)))
}
