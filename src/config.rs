use std::{fmt, net::IpAddr, sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    auth::AuthConfig,
    error::StoreError,
    password::HashingCost,
    postgres::PostgresDb,
    store::{InMemoryDb, UserDatabase},
};

/// Store selected by a `memory://` database url.
pub const IN_MEMORY_DATABASE_URL: &str = "memory://";

/// Longest accepted session lifetime, 30 days.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 30 * 24 * 60 * 60;

/// Signup and login over HTTP.
#[derive(Parser, Clone)]
#[command(name = "auth-server")]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    pub port: u16,

    /// `postgres://…` connection string, or `memory://` for a process-local store that is
    /// lost on restart
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Upper bound on pooled database connections
    #[arg(long, default_value_t = 5, env = "DATABASE_MAX_CONNECTIONS")]
    pub database_max_connections: u32,

    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// `iss` claim written into and required of session tokens
    #[arg(long, default_value = "auth-server", env = "TOKEN_ISSUER")]
    pub token_issuer: String,

    /// How long a session token stays valid
    #[arg(
        long,
        default_value_t = 60 * 60,
        env = "TOKEN_LIFETIME_SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_LIFETIME_SECS)
    )]
    pub token_lifetime_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Settings {
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            auth_token_issuer: self.token_issuer.clone(),
            auth_token_secret: self.jwt_secret.clone(),
            auth_token_lifetime: Duration::from_secs(self.token_lifetime_secs),
            hashing_cost: HashingCost::default(),
        }
    }

    pub fn uses_in_memory_store(&self) -> bool {
        self.database_url == IN_MEMORY_DATABASE_URL
    }

    /// Which backend `database_url` selects, safe to log.
    pub fn store_kind(&self) -> &'static str {
        if self.uses_in_memory_store() {
            "in-memory"
        } else {
            "postgres"
        }
    }

    /// Open the user store named by `database_url`.
    pub async fn open_user_database(&self) -> Result<Arc<dyn UserDatabase>, StoreError> {
        if self.uses_in_memory_store() {
            return Ok(Arc::new(InMemoryDb::new()));
        }

        let db = PostgresDb::connect(&self.database_url, self.database_max_connections).await?;
        Ok(Arc::new(db))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("store", &self.store_kind())
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_issuer", &self.token_issuer)
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("verbose", &self.verbose)
            .finish()
    }
}
