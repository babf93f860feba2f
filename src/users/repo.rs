use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    models::{NewUser, User},
    update::{FieldValue, UpdateSet},
};

const USER_COLUMNS: &str = "id, name, username, role, password_hash, avatar, last_login, \
                            updated_at, created_at, deleted_at";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate value for {0}")]
    DuplicateField(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return RepoError::NotFound;
        }
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some(c) if c.contains("username") || c.contains("email") => "email",
                    Some(c) => c,
                    None => "unknown",
                };
                return RepoError::DuplicateField(field.to_string());
            }
        }
        RepoError::Database(e)
    }
}

/// Persistence interface consumed by the user service.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_username(&self, username: &str) -> Result<User, RepoError>;
    async fn get_by_id(&self, id: i64) -> Result<User, RepoError>;
    /// One page of users plus the total row count.
    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError>;
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    async fn update(&self, id: i64, set: &UpdateSet) -> Result<User, RepoError>;
    async fn delete(&self, id: i64) -> Result<(), RepoError>;
    async fn touch_last_login(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_username(&self, username: &str) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), RepoError> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        debug!(count = users.len(), total, offset, limit, "users listed");
        Ok((users, total))
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, username, role, password_hash, avatar)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let e = RepoError::from(e);
            warn!(error = %e, username = %user.username, "insert user failed");
            e
        })?;
        info!(user_id = created.id, username = %created.username, "user created");
        Ok(created)
    }

    async fn update(&self, id: i64, set: &UpdateSet) -> Result<User, RepoError> {
        let sql = set.to_sql(USER_COLUMNS);
        let mut query = sqlx::query_as::<_, User>(&sql);
        for value in set.values() {
            query = match value {
                FieldValue::Text(s) => query.bind(s.clone()),
                FieldValue::Bytes(b) => query.bind(b.clone()),
            };
        }
        let updated = query.bind(id).fetch_one(&self.db).await?;
        info!(user_id = id, fields = set.assignments().len(), "user updated");
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = RepoError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepoError::NotFound));
        assert!(matches!(AppError::from(err), AppError::UserNotFound));
    }

    #[test]
    fn other_driver_errors_stay_opaque() {
        let err = RepoError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepoError::Database(sqlx::Error::PoolTimedOut)));
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }
}
