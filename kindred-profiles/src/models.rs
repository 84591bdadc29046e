use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{user_hobbies, user_likes, user_photos, user_prefs, users};
use crate::slots::{HobbySet, PhotoSet};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Clone)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub phone_number: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub password_hash: &'a str,
    pub date_of_birth: NaiveDate,
    pub phone_number: Option<&'a str>,
}

#[derive(Debug, AsChangeset, Deserialize, Default, Clone, Validate)]
#[diesel(table_name = users)]
pub struct UserChanges {
    #[validate(length(min = 1, max = 15, message = "name must be 1-15 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    #[serde(rename = "dateofbirth")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(rename = "phonenumber")]
    #[validate(length(max = 20, message = "phone number must be at most 20 characters"))]
    pub phone_number: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.date_of_birth.is_none()
            && self.phone_number.is_none()
    }
}

/// Public identity of a user. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    #[serde(rename = "dateofbirth")]
    pub date_of_birth: NaiveDate,
    #[serde(rename = "phonenumber")]
    pub phone_number: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            date_of_birth: row.date_of_birth,
            phone_number: row.phone_number,
        }
    }
}

/// What the store needs to create an account and its optional side rows.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub phone_number: Option<String>,
    pub prefs: Option<Preferences>,
    pub photos: Option<PhotoSet>,
    pub hobbies: Option<HobbySet>,
}

/// Partial profile update. Side sets are replaced wholesale when present.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub user: UserChanges,
    pub prefs: Option<Preferences>,
    pub photos: Option<PhotoSet>,
    pub hobbies: Option<HobbySet>,
}

// --- Preferences ---

#[derive(Debug, Queryable, Identifiable, Clone)]
#[diesel(table_name = user_prefs)]
pub struct PrefsRow {
    pub id: i32,
    pub user_id: i32,
    pub gender: Option<i32>,
    pub height: Option<i32>,
    pub gender_interest: Option<i32>,
    pub relationship_interest: Option<i32>,
    pub is_smoke: Option<bool>,
    pub is_drink: Option<bool>,
    pub religion: Option<i32>,
    pub bio: Option<String>,
    pub opening_move: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct Preferences {
    pub gender: Option<i32>,
    pub height: Option<i32>,
    #[serde(rename = "genderinterest")]
    pub gender_interest: Option<i32>,
    #[serde(rename = "relationshipinterest")]
    pub relationship_interest: Option<i32>,
    pub is_smoke: Option<bool>,
    pub is_drink: Option<bool>,
    pub religion: Option<i32>,
    #[validate(length(max = 255, message = "bio must be at most 255 characters"))]
    pub bio: Option<String>,
    #[serde(rename = "openingmove")]
    #[validate(length(max = 100, message = "opening move must be at most 100 characters"))]
    pub opening_move: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl Preferences {
    /// `Some` only when both coordinates are present.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        }
    }

    pub fn has_partial_location(&self) -> bool {
        self.latitude.is_some() != self.longitude.is_some()
    }
}

impl From<PrefsRow> for Preferences {
    fn from(row: PrefsRow) -> Self {
        Self {
            gender: row.gender,
            height: row.height,
            gender_interest: row.gender_interest,
            relationship_interest: row.relationship_interest,
            is_smoke: row.is_smoke,
            is_drink: row.is_drink,
            religion: row.religion,
            bio: row.bio,
            opening_move: row.opening_move,
            latitude: row.latitude,
            longitude: row.longitude,
            last_login: row.last_login,
        }
    }
}

/// Full-replace upsert payload. `last_login` is owned by the login path.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = user_prefs, treat_none_as_null = true)]
pub struct PrefsRecord<'a> {
    pub user_id: i32,
    pub gender: Option<i32>,
    pub height: Option<i32>,
    pub gender_interest: Option<i32>,
    pub relationship_interest: Option<i32>,
    pub is_smoke: Option<bool>,
    pub is_drink: Option<bool>,
    pub religion: Option<i32>,
    pub bio: Option<&'a str>,
    pub opening_move: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl<'a> PrefsRecord<'a> {
    pub fn new(user_id: i32, prefs: &'a Preferences) -> Self {
        Self {
            user_id,
            gender: prefs.gender,
            height: prefs.height,
            gender_interest: prefs.gender_interest,
            relationship_interest: prefs.relationship_interest,
            is_smoke: prefs.is_smoke,
            is_drink: prefs.is_drink,
            religion: prefs.religion,
            bio: prefs.bio.as_deref(),
            opening_move: prefs.opening_move.as_deref(),
            latitude: prefs.latitude,
            longitude: prefs.longitude,
        }
    }
}

// --- Photos ---

#[derive(Debug, Queryable, Identifiable, Clone)]
#[diesel(table_name = user_photos)]
pub struct PhotosRow {
    pub id: i32,
    pub user_id: i32,
    pub photo1: String,
    pub photo2: Option<String>,
    pub photo3: Option<String>,
    pub photo4: Option<String>,
    pub photo5: Option<String>,
}

impl From<PhotosRow> for PhotoSet {
    fn from(row: PhotosRow) -> Self {
        PhotoSet::from_numbered([Some(row.photo1), row.photo2, row.photo3, row.photo4, row.photo5])
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = user_photos, treat_none_as_null = true)]
pub struct PhotosRecord {
    pub user_id: i32,
    pub photo1: String,
    pub photo2: Option<String>,
    pub photo3: Option<String>,
    pub photo4: Option<String>,
    pub photo5: Option<String>,
}

impl PhotosRecord {
    pub fn new(user_id: i32, photos: &PhotoSet) -> Self {
        let [p1, photo2, photo3, photo4, photo5] = photos.clone().into_numbered();
        Self {
            user_id,
            photo1: p1.unwrap_or_default(),
            photo2,
            photo3,
            photo4,
            photo5,
        }
    }
}

// --- Hobbies ---

#[derive(Debug, Queryable, Identifiable, Clone)]
#[diesel(table_name = user_hobbies)]
pub struct HobbiesRow {
    pub id: i32,
    pub user_id: i32,
    pub hobby1: Option<i32>,
    pub hobby2: Option<i32>,
    pub hobby3: Option<i32>,
    pub hobby4: Option<i32>,
    pub hobby5: Option<i32>,
}

impl From<HobbiesRow> for HobbySet {
    fn from(row: HobbiesRow) -> Self {
        HobbySet::from_numbered([row.hobby1, row.hobby2, row.hobby3, row.hobby4, row.hobby5])
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = user_hobbies, treat_none_as_null = true)]
pub struct HobbiesRecord {
    pub user_id: i32,
    pub hobby1: Option<i32>,
    pub hobby2: Option<i32>,
    pub hobby3: Option<i32>,
    pub hobby4: Option<i32>,
    pub hobby5: Option<i32>,
}

impl HobbiesRecord {
    pub fn new(user_id: i32, hobbies: &HobbySet) -> Self {
        let [hobby1, hobby2, hobby3, hobby4, hobby5] = hobbies.clone().into_numbered();
        Self { user_id, hobby1, hobby2, hobby3, hobby4, hobby5 }
    }
}

// --- Like ---

#[derive(Debug, Insertable)]
#[diesel(table_name = user_likes)]
pub struct NewLike {
    pub source_id: i32,
    pub target_id: i32,
    pub like_date: NaiveDate,
}

// --- Profile view ---

/// A user joined with whichever side rows exist for them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefs: Option<Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<PhotoSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<HobbySet>,
}

impl ProfileView {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}
