//! Discovery sets and likes.
//!
//! Matches are never stored: a pair is a match exactly when both directed
//! edges exist, so [`matches`] derives them from the two edge sets.

use std::collections::HashSet;

use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::ProfileView;
use crate::store::ProfileStore;

/// Upper bound on the explore set.
pub const EXPLORE_LIMIT: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub source_id: i32,
    pub target_id: i32,
    /// `false` when the edge already existed.
    pub created: bool,
}

/// Random candidates for `viewer`, excluding the viewer and everyone already liked.
pub fn explore(store: &dyn ProfileStore, viewer: i32) -> AppResult<Vec<ProfileView>> {
    ensure_user(store, viewer)?;

    let mut excluded = store.like_targets(viewer)?;
    excluded.push(viewer);

    let ids = store.sample_user_ids(&excluded, EXPLORE_LIMIT)?;
    store.load_views(&ids)
}

/// Users who liked `viewer`.
pub fn liked_me(store: &dyn ProfileStore, viewer: i32) -> AppResult<Vec<ProfileView>> {
    ensure_user(store, viewer)?;
    let ids = store.like_sources(viewer)?;
    store.load_views(&ids)
}

/// Users `viewer` liked.
pub fn my_likes(store: &dyn ProfileStore, viewer: i32) -> AppResult<Vec<ProfileView>> {
    ensure_user(store, viewer)?;
    let ids = store.like_targets(viewer)?;
    store.load_views(&ids)
}

pub fn matches(store: &dyn ProfileStore, viewer: i32) -> AppResult<Vec<ProfileView>> {
    ensure_user(store, viewer)?;
    let ids = mutual_ids(&store.like_sources(viewer)?, &store.like_targets(viewer)?);
    store.load_views(&ids)
}

/// Ids present in both sets, in `liked_me` order.
pub fn mutual_ids(liked_me: &[i32], my_likes: &[i32]) -> Vec<i32> {
    let mine: HashSet<i32> = my_likes.iter().copied().collect();
    let mut seen = HashSet::new();
    liked_me
        .iter()
        .copied()
        .filter(|id| mine.contains(id) && seen.insert(*id))
        .collect()
}

/// Record `source -> target`. Liking twice is a no-op that still succeeds.
pub fn like(
    store: &dyn ProfileStore,
    source_id: i32,
    target_id: i32,
    today: NaiveDate,
) -> AppResult<LikeOutcome> {
    if source_id == target_id {
        return Err(AppError::new(ErrorCode::ValidationError, "users cannot like themselves"));
    }
    ensure_user(store, source_id)?;
    ensure_user(store, target_id)?;

    let created = store.insert_like(source_id, target_id, today)?;

    counter!("likes_recorded_total", "created" => created.to_string()).increment(1);
    if created {
        tracing::info!(source_id, target_id, "like recorded");
    } else {
        tracing::debug!(source_id, target_id, "like already present");
    }

    Ok(LikeOutcome { source_id, target_id, created })
}

fn ensure_user(store: &dyn ProfileStore, id: i32) -> AppResult<()> {
    if store.user_exists(id)? {
        Ok(())
    } else {
        Err(AppError::new(ErrorCode::UserNotFound, format!("user {id} not found")))
    }
}
