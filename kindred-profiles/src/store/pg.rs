use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::{exists, sql};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Double;

use kindred_shared::clients::db::DbPool;
use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use super::{Credential, ProfileStore};
use crate::models::{
    GeoPoint, HobbiesRecord, HobbiesRow, NewAccount, NewLike, NewUserRow, PhotosRecord, PhotosRow,
    Preferences, PrefsRecord, PrefsRow, ProfileUpdate, ProfileView, User, UserRow,
};
use crate::schema::{user_hobbies, user_likes, user_photos, user_prefs, users};
use crate::slots::{HobbySet, PhotoSet};

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

/// Postgres-backed store. Every call checks out its own pooled connection.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<PgPooled> {
        self.pool.get().map_err(|e| AppError::internal(e.to_string()))
    }
}

fn email_conflict(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::new(ErrorCode::EmailAlreadyExists, "email already registered")
        }
        other => other.into(),
    }
}

fn write_side_rows(
    conn: &mut PgConnection,
    user_id: i32,
    prefs: Option<&Preferences>,
    photos: Option<&PhotoSet>,
    hobbies: Option<&HobbySet>,
) -> QueryResult<()> {
    if let Some(prefs) = prefs {
        let record = PrefsRecord::new(user_id, prefs);
        diesel::insert_into(user_prefs::table)
            .values(&record)
            .on_conflict(user_prefs::user_id)
            .do_update()
            .set(&record)
            .execute(conn)?;
    }

    if let Some(photos) = photos {
        let record = PhotosRecord::new(user_id, photos);
        diesel::insert_into(user_photos::table)
            .values(&record)
            .on_conflict(user_photos::user_id)
            .do_update()
            .set(&record)
            .execute(conn)?;
    }

    if let Some(hobbies) = hobbies {
        let record = HobbiesRecord::new(user_id, hobbies);
        diesel::insert_into(user_hobbies::table)
            .values(&record)
            .on_conflict(user_hobbies::user_id)
            .do_update()
            .set(&record)
            .execute(conn)?;
    }

    Ok(())
}

impl ProfileStore for PgStore {
    fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    fn create_account(&self, account: &NewAccount) -> AppResult<i32> {
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let new_user = NewUserRow {
                name: &account.name,
                email: account.email.as_deref(),
                password_hash: &account.password_hash,
                date_of_birth: account.date_of_birth,
                phone_number: account.phone_number.as_deref(),
            };

            let id: i32 = diesel::insert_into(users::table)
                .values(&new_user)
                .returning(users::id)
                .get_result(conn)
                .map_err(email_conflict)?;

            write_side_rows(
                conn,
                id,
                account.prefs.as_ref(),
                account.photos.as_ref(),
                account.hobbies.as_ref(),
            )?;

            Ok(id)
        })
    }

    fn list_users(&self, limit: i64) -> AppResult<Vec<User>> {
        let mut conn = self.conn()?;
        let rows = users::table
            .order(users::id.asc())
            .limit(limit)
            .load::<UserRow>(&mut conn)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    fn user_exists(&self, id: i32) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let found = diesel::select(exists(users::table.find(id))).get_result::<bool>(&mut conn)?;
        Ok(found)
    }

    fn update_profile(&self, id: i32, update: &ProfileUpdate) -> AppResult<bool> {
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            let found = diesel::select(exists(users::table.find(id))).get_result::<bool>(conn)?;
            if !found {
                return Ok(false);
            }

            if !update.user.is_empty() {
                diesel::update(users::table.find(id))
                    .set(&update.user)
                    .execute(conn)
                    .map_err(email_conflict)?;
            }

            write_side_rows(
                conn,
                id,
                update.prefs.as_ref(),
                update.photos.as_ref(),
                update.hobbies.as_ref(),
            )?;

            Ok(true)
        })
    }

    fn delete_account(&self, id: i32) -> AppResult<bool> {
        let mut conn = self.conn()?;

        conn.transaction::<_, AppError, _>(|conn| {
            // Dependents first: nothing may reference the user row when it goes.
            diesel::delete(
                user_likes::table
                    .filter(user_likes::source_id.eq(id).or(user_likes::target_id.eq(id))),
            )
            .execute(conn)?;
            diesel::delete(user_prefs::table.filter(user_prefs::user_id.eq(id))).execute(conn)?;
            diesel::delete(user_photos::table.filter(user_photos::user_id.eq(id))).execute(conn)?;
            diesel::delete(user_hobbies::table.filter(user_hobbies::user_id.eq(id))).execute(conn)?;

            let removed = diesel::delete(users::table.find(id)).execute(conn)?;
            Ok(removed > 0)
        })
    }

    fn find_credential_by_email(&self, email: &str) -> AppResult<Option<Credential>> {
        let mut conn = self.conn()?;
        let found = users::table
            .filter(users::email.eq(email))
            .select((users::id, users::password_hash))
            .first::<(i32, String)>(&mut conn)
            .optional()?;
        Ok(found.map(|(user_id, password_hash)| Credential { user_id, password_hash }))
    }

    fn find_credential(&self, id: i32) -> AppResult<Option<Credential>> {
        let mut conn = self.conn()?;
        let found = users::table
            .find(id)
            .select((users::id, users::password_hash))
            .first::<(i32, String)>(&mut conn)
            .optional()?;
        Ok(found.map(|(user_id, password_hash)| Credential { user_id, password_hash }))
    }

    fn set_password_hash(&self, id: i32, password_hash: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(users::table.find(id))
            .set(users::password_hash.eq(password_hash))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn record_login(&self, id: i32, at: DateTime<Utc>, location: Option<GeoPoint>) -> AppResult<()> {
        let mut conn = self.conn()?;

        match location {
            Some(point) => {
                diesel::insert_into(user_prefs::table)
                    .values((
                        user_prefs::user_id.eq(id),
                        user_prefs::last_login.eq(at),
                        user_prefs::latitude.eq(point.latitude),
                        user_prefs::longitude.eq(point.longitude),
                    ))
                    .on_conflict(user_prefs::user_id)
                    .do_update()
                    .set((
                        user_prefs::last_login.eq(at),
                        user_prefs::latitude.eq(point.latitude),
                        user_prefs::longitude.eq(point.longitude),
                    ))
                    .execute(&mut conn)?;
            }
            None => {
                diesel::insert_into(user_prefs::table)
                    .values((user_prefs::user_id.eq(id), user_prefs::last_login.eq(at)))
                    .on_conflict(user_prefs::user_id)
                    .do_update()
                    .set(user_prefs::last_login.eq(at))
                    .execute(&mut conn)?;
            }
        }

        Ok(())
    }

    fn load_views(&self, ids: &[i32]) -> AppResult<Vec<ProfileView>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn()?;

        let mut found: HashMap<i32, UserRow> = users::table
            .filter(users::id.eq_any(ids))
            .load::<UserRow>(&mut conn)?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        let mut prefs: HashMap<i32, PrefsRow> = user_prefs::table
            .filter(user_prefs::user_id.eq_any(ids))
            .load::<PrefsRow>(&mut conn)?
            .into_iter()
            .map(|row| (row.user_id, row))
            .collect();

        let mut photos: HashMap<i32, PhotosRow> = user_photos::table
            .filter(user_photos::user_id.eq_any(ids))
            .load::<PhotosRow>(&mut conn)?
            .into_iter()
            .map(|row| (row.user_id, row))
            .collect();

        let mut hobbies: HashMap<i32, HobbiesRow> = user_hobbies::table
            .filter(user_hobbies::user_id.eq_any(ids))
            .load::<HobbiesRow>(&mut conn)?
            .into_iter()
            .map(|row| (row.user_id, row))
            .collect();

        let views = ids
            .iter()
            .filter_map(|id| found.remove(id))
            .map(|row| {
                let id = row.id;
                ProfileView {
                    user: row.into(),
                    prefs: prefs.remove(&id).map(Into::into),
                    photos: photos.remove(&id).map(Into::into),
                    hobbies: hobbies.remove(&id).map(Into::into),
                }
            })
            .collect();

        Ok(views)
    }

    fn insert_like(&self, source_id: i32, target_id: i32, on: NaiveDate) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let new_like = NewLike { source_id, target_id, like_date: on };

        let inserted = diesel::insert_into(user_likes::table)
            .values(&new_like)
            .on_conflict((user_likes::source_id, user_likes::target_id))
            .do_nothing()
            .execute(&mut conn)?;

        Ok(inserted == 1)
    }

    fn like_targets(&self, source_id: i32) -> AppResult<Vec<i32>> {
        let mut conn = self.conn()?;
        let ids = user_likes::table
            .filter(user_likes::source_id.eq(source_id))
            .order(user_likes::id.desc())
            .select(user_likes::target_id)
            .load::<i32>(&mut conn)?;
        Ok(ids)
    }

    fn like_sources(&self, target_id: i32) -> AppResult<Vec<i32>> {
        let mut conn = self.conn()?;
        let ids = user_likes::table
            .filter(user_likes::target_id.eq(target_id))
            .order(user_likes::id.desc())
            .select(user_likes::source_id)
            .load::<i32>(&mut conn)?;
        Ok(ids)
    }

    fn sample_user_ids(&self, excluded: &[i32], limit: i64) -> AppResult<Vec<i32>> {
        let mut conn = self.conn()?;
        let ids = users::table
            .filter(users::id.ne_all(excluded))
            .order(sql::<Double>("RANDOM()"))
            .limit(limit)
            .select(users::id)
            .load::<i32>(&mut conn)?;
        Ok(ids)
    }
}

/// These run against a migrated Postgres named by `KINDRED_TEST_DATABASE_URL`.
/// Every test works inside one never-committed transaction.
#[cfg(test)]
mod tests {
    use super::*;
    use diesel::r2d2::{Pool, TestCustomizer};

    const DATABASE_ENV: &str = "KINDRED_TEST_DATABASE_URL";

    fn store() -> PgStore {
        let url = std::env::var(DATABASE_ENV).unwrap_or_else(|_| panic!("{DATABASE_ENV} is not set"));
        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(TestCustomizer))
            .build(ConnectionManager::<PgConnection>::new(url))
            .unwrap();
        PgStore::new(pool)
    }

    fn account(store: &PgStore, name: &str) -> i32 {
        let account = NewAccount {
            name: name.into(),
            email: Some(format!("{}@example.com", uuid::Uuid::new_v4())),
            password_hash: "hash".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            phone_number: None,
            prefs: Some(Preferences { bio: Some("hello".into()), ..Preferences::default() }),
            photos: Some(PhotoSet::new(vec!["a.jpg".into()]).unwrap()),
            hobbies: Some(HobbySet::new(vec![1, 2]).unwrap()),
        };
        store.create_account(&account).unwrap()
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    #[ignore = "needs KINDRED_TEST_DATABASE_URL"]
    fn repeated_like_is_one_row() {
        let store = store();
        let (a, b) = (account(&store, "pg-a"), account(&store, "pg-b"));

        assert!(store.insert_like(a, b, today()).unwrap());
        assert!(!store.insert_like(a, b, today()).unwrap());

        assert_eq!(store.like_targets(a).unwrap(), vec![b]);
        assert_eq!(store.like_sources(b).unwrap(), vec![a]);
    }

    #[test]
    #[ignore = "needs KINDRED_TEST_DATABASE_URL"]
    fn delete_removes_edges_and_side_rows() {
        let store = store();
        let (a, b) = (account(&store, "pg-a"), account(&store, "pg-b"));
        store.insert_like(a, b, today()).unwrap();
        store.insert_like(b, a, today()).unwrap();

        assert!(store.delete_account(a).unwrap());

        assert!(store.like_targets(b).unwrap().is_empty());
        assert!(store.like_sources(b).unwrap().is_empty());
        assert!(store.load_views(&[a]).unwrap().is_empty());
        assert!(!store.user_exists(a).unwrap());
        assert!(!store.delete_account(a).unwrap());
    }

    #[test]
    #[ignore = "needs KINDRED_TEST_DATABASE_URL"]
    fn sampling_skips_excluded_ids() {
        let store = store();
        let ids: Vec<i32> = (0..4).map(|i| account(&store, &format!("pg-{i}"))).collect();

        let sampled = store.sample_user_ids(&ids[..3], 1000).unwrap();
        assert!(sampled.contains(&ids[3]));
        assert!(!sampled.iter().any(|id| ids[..3].contains(id)));
        assert_eq!(store.sample_user_ids(&[], 2).unwrap().len(), 2);
    }

    #[test]
    #[ignore = "needs KINDRED_TEST_DATABASE_URL"]
    fn emails_are_unique_case_insensitively() {
        let store = store();
        let mut first = NewAccount {
            name: "pg-mail".into(),
            email: Some("Case.Check@example.com".into()),
            password_hash: "hash".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            phone_number: None,
            prefs: None,
            photos: None,
            hobbies: None,
        };
        store.create_account(&first).unwrap();

        first.email = Some("case.check@EXAMPLE.com".into());
        let err = store.create_account(&first).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::EmailAlreadyExists);
    }

    #[test]
    #[ignore = "needs KINDRED_TEST_DATABASE_URL"]
    fn views_follow_requested_order() {
        let store = store();
        let (a, b) = (account(&store, "pg-a"), account(&store, "pg-b"));

        let views = store.load_views(&[b, a, b]).unwrap();
        let ids: Vec<i32> = views.iter().map(ProfileView::id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(views[0].photos.as_ref().map(PhotoSet::primary), Some("a.jpg"));
        assert_eq!(views[0].hobbies.as_ref().map(HobbySet::codes), Some(&[1, 2][..]));
    }
}
