//! Persistence boundary for profiles and like edges.
//!
//! The Match Engine and the profile service only see [`ProfileStore`]; the
//! diesel implementation lives in [`pg`].

use chrono::{DateTime, NaiveDate, Utc};

use kindred_shared::errors::AppResult;

use crate::models::{GeoPoint, NewAccount, ProfileUpdate, ProfileView, User};

pub mod pg;
#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

/// Stored login material for one account.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: i32,
    pub password_hash: String,
}

pub trait ProfileStore: Send + Sync {
    /// Cheap round trip used by the health check.
    fn ping(&self) -> AppResult<()>;

    /// Insert a user and any supplied side rows atomically. Returns the new id.
    fn create_account(&self, account: &NewAccount) -> AppResult<i32>;

    fn list_users(&self, limit: i64) -> AppResult<Vec<User>>;

    fn user_exists(&self, id: i32) -> AppResult<bool>;

    /// Apply a profile update atomically. Returns `false` when the user is absent.
    fn update_profile(&self, id: i32, update: &ProfileUpdate) -> AppResult<bool>;

    /// Remove a user, its side rows and every like edge touching it.
    /// Returns `false` when the user is absent.
    fn delete_account(&self, id: i32) -> AppResult<bool>;

    fn find_credential_by_email(&self, email: &str) -> AppResult<Option<Credential>>;

    fn find_credential(&self, id: i32) -> AppResult<Option<Credential>>;

    fn set_password_hash(&self, id: i32, password_hash: &str) -> AppResult<bool>;

    /// Upsert the preference row's `last_login`, and its location when given.
    fn record_login(&self, id: i32, at: DateTime<Utc>, location: Option<GeoPoint>) -> AppResult<()>;

    /// Hydrate views for `ids`. Unknown ids are skipped; order follows `ids`.
    fn load_views(&self, ids: &[i32]) -> AppResult<Vec<ProfileView>>;

    /// Insert the edge unless it already exists. Returns `true` when a row was created.
    fn insert_like(&self, source_id: i32, target_id: i32, on: NaiveDate) -> AppResult<bool>;

    /// Targets of edges sourced by `source_id`.
    fn like_targets(&self, source_id: i32) -> AppResult<Vec<i32>>;

    /// Sources of edges targeting `target_id`.
    fn like_sources(&self, target_id: i32) -> AppResult<Vec<i32>>;

    /// Up to `limit` user ids outside `excluded`, in random order.
    fn sample_user_ids(&self, excluded: &[i32], limit: i64) -> AppResult<Vec<i32>>;
}
