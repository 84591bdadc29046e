use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::{Credential, ProfileStore};
use crate::models::{GeoPoint, NewAccount, Preferences, ProfileUpdate, ProfileView, User};
use crate::slots::{HobbySet, PhotoSet};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
    prefs: Option<Preferences>,
    photos: Option<PhotoSet>,
    hobbies: Option<HobbySet>,
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    users: BTreeMap<i32, StoredUser>,
    likes: Vec<(i32, i32, NaiveDate)>,
}

/// In-process store for service and router tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn like_count(&self) -> usize {
        self.lock().likes.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

fn email_taken(inner: &Inner, email: Option<&str>, except: Option<i32>) -> bool {
    let Some(email) = email else { return false };
    inner
        .users
        .values()
        .any(|s| Some(s.user.id) != except && s.user.email.as_deref() == Some(email))
}

impl ProfileStore for MemoryStore {
    fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn create_account(&self, account: &NewAccount) -> AppResult<i32> {
        let mut inner = self.lock();
        if email_taken(&inner, account.email.as_deref(), None) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.users.insert(
            id,
            StoredUser {
                user: User {
                    id,
                    name: account.name.clone(),
                    email: account.email.clone(),
                    date_of_birth: account.date_of_birth,
                    phone_number: account.phone_number.clone(),
                },
                password_hash: account.password_hash.clone(),
                prefs: account.prefs.clone(),
                photos: account.photos.clone(),
                hobbies: account.hobbies.clone(),
            },
        );
        Ok(id)
    }

    fn list_users(&self, limit: i64) -> AppResult<Vec<User>> {
        let inner = self.lock();
        Ok(inner
            .users
            .values()
            .take(limit.max(0) as usize)
            .map(|s| s.user.clone())
            .collect())
    }

    fn user_exists(&self, id: i32) -> AppResult<bool> {
        Ok(self.lock().users.contains_key(&id))
    }

    fn update_profile(&self, id: i32, update: &ProfileUpdate) -> AppResult<bool> {
        let mut inner = self.lock();
        if !inner.users.contains_key(&id) {
            return Ok(false);
        }
        if email_taken(&inner, update.user.email.as_deref(), Some(id)) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }

        let Some(stored) = inner.users.get_mut(&id) else { return Ok(false) };
        let changes = &update.user;
        if let Some(name) = &changes.name {
            stored.user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            stored.user.email = Some(email.clone());
        }
        if let Some(dob) = changes.date_of_birth {
            stored.user.date_of_birth = dob;
        }
        if let Some(phone) = &changes.phone_number {
            stored.user.phone_number = Some(phone.clone());
        }
        if let Some(prefs) = &update.prefs {
            let last_login = stored.prefs.as_ref().and_then(|p| p.last_login);
            stored.prefs = Some(Preferences { last_login, ..prefs.clone() });
        }
        if let Some(photos) = &update.photos {
            stored.photos = Some(photos.clone());
        }
        if let Some(hobbies) = &update.hobbies {
            stored.hobbies = Some(hobbies.clone());
        }
        Ok(true)
    }

    fn delete_account(&self, id: i32) -> AppResult<bool> {
        let mut inner = self.lock();
        inner.likes.retain(|(s, t, _)| *s != id && *t != id);
        Ok(inner.users.remove(&id).is_some())
    }

    fn find_credential_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        let inner = self.lock();
        Ok(inner
            .users
            .values()
            .find(|s| s.user.email.as_deref() == Some(email))
            .map(|s| Credential { user_id: s.user.id, password_hash: s.password_hash.clone() }))
    }

    fn find_credential(&self, id: i32) -> AppResult<Option<Credential>> {
        let inner = self.lock();
        Ok(inner
            .users
            .get(&id)
            .map(|s| Credential { user_id: id, password_hash: s.password_hash.clone() }))
    }

    fn set_password_hash(&self, id: i32, password_hash: &str) -> AppResult<bool> {
        let mut inner = self.lock();
        match inner.users.get_mut(&id) {
            Some(stored) => {
                stored.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn record_login(&self, id: i32, at: DateTime<Utc>, location: Option<GeoPoint>) -> AppResult<()> {
        let mut inner = self.lock();
        if let Some(stored) = inner.users.get_mut(&id) {
            let prefs = stored.prefs.get_or_insert_with(Preferences::default);
            prefs.last_login = Some(at);
            if let Some(point) = location {
                prefs.latitude = Some(point.latitude);
                prefs.longitude = Some(point.longitude);
            }
        }
        Ok(())
    }

    fn load_views(&self, ids: &[i32]) -> AppResult<Vec<ProfileView>> {
        let inner = self.lock();
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| inner.users.get(id))
            .map(|s| ProfileView {
                user: s.user.clone(),
                prefs: s.prefs.clone(),
                photos: s.photos.clone(),
                hobbies: s.hobbies.clone(),
            })
            .collect())
    }

    fn insert_like(&self, source_id: i32, target_id: i32, on: NaiveDate) -> AppResult<bool> {
        let mut inner = self.lock();
        if inner.likes.iter().any(|(s, t, _)| *s == source_id && *t == target_id) {
            return Ok(false);
        }
        inner.likes.push((source_id, target_id, on));
        Ok(true)
    }

    fn like_targets(&self, source_id: i32) -> AppResult<Vec<i32>> {
        let inner = self.lock();
        Ok(inner.likes.iter().rev().filter(|(s, _, _)| *s == source_id).map(|(_, t, _)| *t).collect())
    }

    fn like_sources(&self, target_id: i32) -> AppResult<Vec<i32>> {
        let inner = self.lock();
        Ok(inner.likes.iter().rev().filter(|(_, t, _)| *t == target_id).map(|(s, _, _)| *s).collect())
    }

    fn sample_user_ids(&self, excluded: &[i32], limit: i64) -> AppResult<Vec<i32>> {
        let inner = self.lock();
        Ok(inner
            .users
            .keys()
            .filter(|id| !excluded.contains(id))
            .take(limit.max(0) as usize)
            .copied()
            .collect())
    }
}
