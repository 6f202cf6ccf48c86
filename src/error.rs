use std::error::Error;

use warp::{hyper::StatusCode, reject::Reject};

/// Failures reported by a [`crate::UserDatabase`] implementation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("a record with that username already exists")]
    DuplicateKey,
    #[error("user store is unreachable")]
    Unavailable {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("error during database operation")]
    Backend {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("an account with that username already exists")]
    UsernameAlreadyTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
    #[error("user store is unavailable")]
    StoreUnavailable {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("error during database operation")]
    Database {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("error with token")]
    Token {
        #[from]
        source: Option<jsonwebtoken::errors::Error>,
    },
    #[error("error while hashing password")]
    Hashing {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl AuthError {
    /// The status the HTTP boundary answers with for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::UsernameAlreadyTaken => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidPassword | AuthError::Token { .. } => StatusCode::UNAUTHORIZED,
            AuthError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Database { .. } | AuthError::Hashing { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal failures never leak their source.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(_)
            | AuthError::UsernameAlreadyTaken
            | AuthError::UserNotFound
            | AuthError::InvalidPassword => self.to_string(),
            AuthError::Token { .. } => "access denied".to_string(),
            AuthError::StoreUnavailable { .. } => "service temporarily unavailable".to_string(),
            AuthError::Database { .. } | AuthError::Hashing { .. } => {
                "an unknown error has occurred".to_string()
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey => AuthError::UsernameAlreadyTaken,
            StoreError::Unavailable { source } => AuthError::StoreUnavailable { source },
            StoreError::Backend { source } => AuthError::Database { source },
        }
    }
}

impl Reject for AuthError {}
