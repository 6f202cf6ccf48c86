use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::StoreError,
    store::UserDatabase,
    types::{HashedPassword, User, UserID, Username},
};

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
)";

/// User store backed by a Postgres table. Username uniqueness is enforced by the
/// table's `UNIQUE` constraint.
#[derive(Debug, Clone)]
pub struct PostgresDb {
    pool: PgPool,
}

impl PostgresDb {
    /// Connect and make sure the `users` table exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(classify)?;

        let db = Self::from_pool(pool);
        db.ensure_schema().await?;

        Ok(db)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }
}

#[async_trait]
impl UserDatabase for PostgresDb {
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, StoreError> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = $1")
                .bind(&username.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;

        Ok(row.map(|(id, username, password_hash)| User {
            id: UserID(id),
            username: Username(username),
            password_hash: HashedPassword(password_hash),
        }))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3)")
            .bind(&user.id.0)
            .bind(&user.username.0)
            .bind(&user.password_hash.0)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey,
        down @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed) => StoreError::Unavailable {
            source: down.into(),
        },
        other => StoreError::Backend {
            source: other.into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, error::Error as StdError, fmt};

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;
    use crate::error::AuthError;

    #[derive(Debug)]
    struct TestDbError {
        code: &'static str,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error {}", self.code)
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23502" => ErrorKind::NotNullViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn database_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(TestDbError { code }))
    }

    #[test]
    fn unique_violation_is_a_duplicate_key() {
        let err = classify(database_error("23505"));
        assert!(matches!(err, StoreError::DuplicateKey));

        let err: AuthError = err.into();
        assert!(matches!(err, AuthError::UsernameAlreadyTaken));
    }

    #[test]
    fn other_constraint_violations_are_backend_errors() {
        assert!(matches!(
            classify(database_error("23502")),
            StoreError::Backend { .. }
        ));
        assert!(matches!(
            classify(database_error("99999")),
            StoreError::Backend { .. }
        ));
    }

    #[test]
    fn connection_failures_are_unavailable() {
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable { .. }
        ));
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            classify(sqlx::Error::Io(io)),
            StoreError::Unavailable { .. }
        ));
    }

    #[test]
    fn other_failures_are_backend_errors() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            StoreError::Backend { .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_server_fails_to_connect() {
        let result = PostgresDb::connect("postgres://nobody@127.0.0.1:1/none", 1).await;
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }
}
