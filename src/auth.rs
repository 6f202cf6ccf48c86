use std::{fmt, sync::Arc, time::Duration};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    password::{HashingCost, PasswordHasher},
    store::UserDatabase,
    token::TokenIssuer,
    types::{Claims, IssuedToken, User, UserID, Username},
};

#[derive(Clone)]
pub struct AuthConfig {
    /// The issuer for auth tokens. We will validate that all auth tokens match the given issuer.
    pub auth_token_issuer: String,
    /// The secret used to sign JWT authorization tokens.
    /// If the secret changes, all currently authenticated sessions will be terminated.
    pub auth_token_secret: String,
    /// How long auth tokens should remain valid for. After this interval, the client will have to re-login.
    pub auth_token_lifetime: Duration,
    pub hashing_cost: HashingCost,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_token_issuer", &self.auth_token_issuer)
            .field("auth_token_secret", &"[REDACTED]")
            .field("auth_token_lifetime", &self.auth_token_lifetime)
            .field("hashing_cost", &self.hashing_cost)
            .finish()
    }
}

/// Account registration and login.
///
/// Cheap to clone; clones share the same user store.
#[derive(Clone)]
pub struct CredentialService {
    database: Arc<dyn UserDatabase>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl CredentialService {
    pub fn new(config: AuthConfig, database: Arc<dyn UserDatabase>) -> Self {
        Self {
            database,
            hasher: PasswordHasher::new(config.hashing_cost),
            tokens: TokenIssuer::new(
                &config.auth_token_secret,
                config.auth_token_issuer,
                config.auth_token_lifetime,
            ),
        }
    }

    pub fn token_lifetime(&self) -> Duration {
        self.tokens.lifetime()
    }

    /// Create an account. Usernames are unique; a taken name fails with
    /// [`AuthError::UsernameAlreadyTaken`] whatever the password.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<UserID, AuthError> {
        let username = require(username, "username and password are required")?;
        require(password, "username and password are required")?;

        let username = Username(username.to_string());

        // Saves an argon2 round for the common case. The store's uniqueness check on
        // insert is what actually guards against concurrent signups.
        if self.database.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameAlreadyTaken);
        }

        let password_hash = self.hasher.hash_blocking(password.to_string()).await?;

        let user = User {
            id: UserID(Uuid::new_v4().to_string()),
            username,
            password_hash,
        };

        self.database.insert(&user).await?;

        info!(user_id = %user.id.0, "user registered");

        Ok(user.id)
    }

    /// Check a username/password pair and issue a session token for it.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let username = require(username, "username and password are required")?;
        require(password, "username and password are required")?;

        let username = Username(username.to_string());

        let user = match self.database.find_by_username(&username).await? {
            Some(user) => user,
            None => {
                warn!("login for unknown user");
                return Err(AuthError::UserNotFound);
            }
        };

        if !self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash)
            .await?
        {
            warn!("login with invalid password");
            return Err(AuthError::InvalidPassword);
        }

        let token = self.tokens.issue(&user.username)?;

        info!(user_id = %user.id.0, "user logged in");

        Ok(token)
    }

    /// Validate a token issued by [`CredentialService::authenticate`] and return who it was issued to.
    pub fn verify_session(&self, token: &str) -> Result<Username, AuthError> {
        let Claims { sub, .. } = self.tokens.verify(token)?;
        Ok(Username(sub))
    }
}

fn require<'a>(value: &'a str, message: &'static str) -> Result<&'a str, AuthError> {
    if value.is_empty() {
        Err(AuthError::Validation(message))
    } else {
        Ok(value)
    }
}
