use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserRecord;
use super::{PageRequest, User, UserDirectory, UserPage};
use crate::configuration::DatabaseSettings;
use crate::error::{AppError, DatabaseError};

const USER_COLUMNS: &str = "id, user_id, name, staff_no, email, password_hash, user_type, \
                            token, refresh_token, created_at, updated_at";

/// PostgreSQL-backed directory over the `users` table
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&settings.connection_string())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                AppError::Database(DatabaseError::ConnectionPool(e.to_string()))
            })?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::UnexpectedError(e.to_string())))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<User, AppError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
        User::try_from(row).map_err(AppError::from)
    }

    async fn count_matching(&self, column: &str, pattern: &str) -> Result<i64, AppError> {
        // escaped so the input is matched literally, never as a regex
        let sql = format!("SELECT COUNT(*) FROM users WHERE {} ~* $1", column);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(regex::escape(pattern))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn email_exists(&self, pattern: &str) -> Result<i64, AppError> {
        self.count_matching("email", pattern).await
    }

    async fn staff_number_exists(&self, pattern: &str) -> Result<i64, AppError> {
        self.count_matching("staff_no", pattern).await
    }

    async fn insert(&self, user: &User) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, user_id, name, staff_no, email, password_hash, user_type,
                               token, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.staff_no)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.user_type.as_str())
        .bind(&user.token)
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_by_staff_number(&self, staff_no: &str) -> Result<User, AppError> {
        self.find_one("staff_no", staff_no).await
    }

    async fn find_by_id(&self, user_id: &str) -> Result<User, AppError> {
        self.find_one("user_id", user_id).await
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("user"));
        }
        Ok(())
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET token = $1, refresh_token = $2, updated_at = $3
            WHERE user_id = $4
            "#,
        )
        .bind(token)
        .bind(refresh_token)
        .bind(updated_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("user"));
        }
        Ok(())
    }

    async fn list_page(&self, request: &PageRequest) -> Result<UserPage, AppError> {
        let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        if total_count == 0 {
            return Ok(UserPage::empty());
        }

        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(request.page_size)
            .bind(request.offset())
            .fetch_all(&self.pool)
            .await?;

        let user_items = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserPage {
            total_count,
            user_items,
        })
    }
}
