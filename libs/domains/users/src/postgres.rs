use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Role, User};
use crate::repository::UserRepository;

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, role, rating, \
     rating_updated_at, created_at, updated_at, deleted_at";

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, stmt: Statement) -> UserResult<Option<User>> {
        UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(User::try_from)
            .transpose()
    }
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    rating: i64,
    rating_updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).map_err(|_| {
            UserError::Internal(format!("User {} has unknown role '{}'", row.id, row.role))
        })?;

        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role,
            rating: row.rating,
            rating_updated_at: row.rating_updated_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn db_error(e: DbErr) -> UserError {
    UserError::Internal(format!("Database error: {}", e))
}

fn write_error(email: &str) -> impl FnOnce(DbErr) -> UserError + '_ {
    move |e| {
        let err_str = e.to_string();
        if err_str.contains("duplicate key") || err_str.contains("unique constraint") {
            UserError::DuplicateEmail(email.to_string())
        } else {
            db_error(e)
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.email.clone().into(),
                user.first_name.clone().into(),
                user.last_name.clone().into(),
                user.password_hash.clone().into(),
                user.role.to_string().into(),
                user.created_at.into(),
                user.updated_at.into(),
            ],
        );

        let created = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(write_error(&user.email))?
            .ok_or_else(|| UserError::Internal("Failed to create user".to_string()))?;

        tracing::info!(user_id = %created.id, "Created user");
        created.try_into()
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );
        self.fetch_one(Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]))
            .await
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL",
            USER_COLUMNS
        );
        self.fetch_one(Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]))
            .await
    }

    async fn list(&self, page: u64, page_size: u64) -> UserResult<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {} FROM users
            WHERE deleted_at IS NULL
            ORDER BY created_at, id
            LIMIT $1 OFFSET $2
            "#,
            USER_COLUMNS
        );
        let offset = page.saturating_sub(1).saturating_mul(page_size);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [(page_size as i64).into(), (offset as i64).into()],
        );

        UserRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn count(&self) -> UserResult<u64> {
        #[derive(FromQueryResult)]
        struct CountResult {
            count: i64,
        }

        let stmt = Statement::from_string(
            DbBackend::Postgres,
            "SELECT COUNT(*) AS count FROM users WHERE deleted_at IS NULL",
        );

        let result = CountResult::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.map(|r| r.count as u64).unwrap_or(0))
    }

    async fn update(&self, user: User) -> UserResult<User> {
        // updated_at is maintained by the touch trigger
        let sql = format!(
            r#"
            UPDATE users
            SET email = $2, first_name = $3, last_name = $4, password_hash = $5, role = $6
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.email.clone().into(),
                user.first_name.clone().into(),
                user.last_name.clone().into(),
                user.password_hash.clone().into(),
                user.role.to_string().into(),
            ],
        );

        let updated = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(write_error(&user.email))?
            .ok_or(UserError::NotFound(user.id))?;

        tracing::info!(user_id = %updated.id, "Updated user");
        updated.try_into()
    }

    async fn soft_delete(&self, id: Uuid) -> UserResult<DateTime<Utc>> {
        #[derive(FromQueryResult)]
        struct Deleted {
            deleted_at: DateTime<Utc>,
        }

        let sql = r#"
            UPDATE users SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING deleted_at
        "#;
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let deleted = Deleted::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or(UserError::NotFound(id))?;

        tracing::info!(user_id = %id, "Soft deleted user");
        Ok(deleted.deleted_at)
    }

    async fn email_exists(&self, email: &str) -> UserResult<bool> {
        #[derive(FromQueryResult)]
        struct ExistsResult {
            exists: bool,
        }

        let sql = "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1)) AS exists";
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]);

        let result = ExistsResult::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.map(|r| r.exists).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn row(id: Uuid, role: &str) -> BTreeMap<&'static str, Value> {
        let now = Utc::now();
        BTreeMap::from([
            ("id", id.into()),
            ("email", "row@example.com".into()),
            ("first_name", "Row".into()),
            ("last_name", "User".into()),
            ("password_hash", "hash".into()),
            ("role", role.into()),
            ("rating", 7i64.into()),
            ("rating_updated_at", Option::<DateTime<Utc>>::None.into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
            ("deleted_at", Option::<DateTime<Utc>>::None.into()),
        ])
    }

    #[tokio::test]
    async fn test_get_by_id_maps_row() {
        let id = Uuid::now_v7();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(id, "moderator")]])
            .into_connection();

        let user = PgUserRepository::new(db).get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Moderator);
        assert_eq!(user.rating, 7);
    }

    #[tokio::test]
    async fn test_unknown_role_is_internal_error() {
        let id = Uuid::now_v7();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(id, "superuser")]])
            .into_connection();

        let result = PgUserRepository::new(db).get_by_id(id).await;
        assert!(matches!(result, Err(UserError::Internal(msg)) if msg.contains("superuser")));
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_duplicate_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom(
                "duplicate key value violates unique constraint \"users_email_key\"".to_string(),
            )])
            .into_connection();

        let user = User::new(
            "dup@example.com".to_string(),
            "Dup".to_string(),
            "User".to_string(),
            "hash".to_string(),
            Role::User,
        );
        let result = PgUserRepository::new(db).create(user).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(email)) if email == "dup@example.com"));
    }

    #[tokio::test]
    async fn test_soft_delete_missing_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let id = Uuid::now_v7();
        let result = PgUserRepository::new(db).soft_delete(id).await;
        assert!(matches!(result, Err(UserError::NotFound(found)) if found == id));
    }
}
