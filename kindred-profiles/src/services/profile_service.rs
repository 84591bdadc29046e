use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::password;
use crate::models::{GeoPoint, NewAccount, Preferences, ProfileUpdate, ProfileView, User, UserChanges};
use crate::slots::{HobbySet, PhotoSet};
use crate::store::ProfileStore;

pub const LIST_LIMIT: i64 = 20;

// --- Requests ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 15, message = "name must be 1-15 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    pub password: String,
    #[serde(rename = "dateofbirth")]
    pub date_of_birth: NaiveDate,
    #[serde(rename = "phonenumber")]
    #[validate(length(max = 20, message = "phone number must be at most 20 characters"))]
    pub phone_number: Option<String>,
    #[validate]
    pub prefs: Option<Preferences>,
    pub photos: Option<PhotoSet>,
    pub hobbies: Option<HobbySet>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(flatten)]
    #[validate]
    pub user: UserChanges,
    #[validate]
    pub prefs: Option<Preferences>,
    pub photos: Option<PhotoSet>,
    pub hobbies: Option<HobbySet>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user_id: i32,
}

// --- Operations ---

pub fn list_users(store: &dyn ProfileStore) -> AppResult<Vec<User>> {
    store.list_users(LIST_LIMIT)
}

pub fn get_profile(store: &dyn ProfileStore, id: i32) -> AppResult<ProfileView> {
    store
        .load_views(&[id])?
        .into_iter()
        .next()
        .ok_or_else(|| user_not_found(id))
}

pub fn create_user(store: &dyn ProfileStore, mut req: CreateUserRequest) -> AppResult<CreatedUser> {
    req.name = req.name.trim().to_string();
    req.email = req.email.as_deref().map(normalize_email);
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    if let Some(prefs) = &req.prefs {
        check_location(prefs)?;
    }
    password::validate_password(&req.password)?;

    let account = NewAccount {
        name: req.name,
        email: req.email,
        password_hash: password::hash_password(&req.password)?,
        date_of_birth: req.date_of_birth,
        phone_number: req.phone_number,
        prefs: req.prefs,
        photos: req.photos,
        hobbies: req.hobbies,
    };

    let user_id = store.create_account(&account)?;
    tracing::info!(user_id, "user created");

    Ok(CreatedUser { user_id })
}

pub fn update_profile(
    store: &dyn ProfileStore,
    id: i32,
    mut req: UpdateProfileRequest,
) -> AppResult<ProfileView> {
    req.user.name = req.user.name.map(|n| n.trim().to_string());
    req.user.email = req.user.email.as_deref().map(normalize_email);
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    if let Some(prefs) = &req.prefs {
        check_location(prefs)?;
    }

    let update = ProfileUpdate { user: req.user, prefs: req.prefs, photos: req.photos, hobbies: req.hobbies };
    if update.user.is_empty() && update.prefs.is_none() && update.photos.is_none() && update.hobbies.is_none() {
        return Err(AppError::new(ErrorCode::ValidationError, "nothing to update"));
    }

    if !store.update_profile(id, &update)? {
        return Err(user_not_found(id));
    }
    tracing::info!(user_id = id, "profile updated");

    get_profile(store, id)
}

pub fn delete_user(store: &dyn ProfileStore, id: i32) -> AppResult<()> {
    if !store.delete_account(id)? {
        return Err(user_not_found(id));
    }
    tracing::info!(user_id = id, "user deleted");
    Ok(())
}

pub fn login(store: &dyn ProfileStore, req: LoginRequest) -> AppResult<ProfileView> {
    let location = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => {
            let point = GeoPoint { latitude, longitude };
            if !point.is_valid() {
                return Err(AppError::new(ErrorCode::ValidationError, "coordinates out of range"));
            }
            Some(point)
        }
        (None, None) => None,
        _ => {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "latitude and longitude must be supplied together",
            ))
        }
    };

    let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");

    let credential = store
        .find_credential_by_email(&normalize_email(&req.email))?
        .ok_or_else(invalid)?;
    if !password::verify_password(&req.password, &credential.password_hash)? {
        return Err(invalid());
    }

    store.record_login(credential.user_id, Utc::now(), location)?;
    tracing::info!(user_id = credential.user_id, "user logged in");

    get_profile(store, credential.user_id)
}

pub fn change_password(store: &dyn ProfileStore, id: i32, req: ChangePasswordRequest) -> AppResult<()> {
    let credential = store.find_credential(id)?.ok_or_else(|| user_not_found(id))?;

    if !password::verify_password(&req.current_password, &credential.password_hash)? {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "current password is incorrect"));
    }
    password::validate_password(&req.new_password)?;

    let hash = password::hash_password(&req.new_password)?;
    if !store.set_password_hash(id, &hash)? {
        return Err(user_not_found(id));
    }
    tracing::info!(user_id = id, "password changed");
    Ok(())
}

fn check_location(prefs: &Preferences) -> AppResult<()> {
    if prefs.has_partial_location() {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "latitude and longitude must be supplied together",
        ));
    }
    match prefs.location() {
        Some(point) if !point.is_valid() => {
            Err(AppError::new(ErrorCode::ValidationError, "coordinates out of range"))
        }
        _ => Ok(()),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn user_not_found(id: i32) -> AppError {
    AppError::new(ErrorCode::UserNotFound, format!("user {id} not found"))
}
