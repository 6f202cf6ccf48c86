use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    error::AuthError,
    types::{Claims, IssuedToken, Username},
};

/// Signs and checks HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            issuer: issuer.into(),
            lifetime,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, username: &Username) -> Result<IssuedToken, AuthError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::Token { source: None })?
            .as_secs();

        let exp = iat
            .checked_add(self.lifetime.as_secs())
            .ok_or(AuthError::Token { source: None })?;

        let claims = Claims {
            sub: username.0.clone(),
            iss: self.issuer.clone(),
            iat,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            expires_in: self.lifetime.as_secs(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token.claims)
    }
}
