use std::{sync::Arc, time::Duration};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;

/// Claims
///
/// The payload signed into every bearer token. Only the user id is embedded: the
/// role is re-read from the database on each request so a demotion takes effect
/// without waiting for the token to expire.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the authenticated user.
    pub sub: Uuid,
    /// Expiration Time (exp): seconds since the epoch after which the token is rejected.
    pub exp: usize,
    /// Issued At (iat): seconds since the epoch when the token was signed.
    pub iat: usize,
}

/// What a verified token identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// CredentialService
///
/// Hashes and verifies passwords and issues and checks bearer tokens. Both keys
/// are derived from one configured secret; the service is built once at startup
/// and shared through `CredentialState`.
pub struct CredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: Duration,
}

/// The concrete type used to share the credential service across the application state.
pub type CredentialState = Arc<CredentialService>;

impl CredentialService {
    pub fn new(secret: &[u8], token_expiry: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.token_key.as_bytes(), config.token_expiry)
    }

    /// hash_password
    ///
    /// Produces an Argon2id PHC string with a fresh random salt, so hashing the same
    /// password twice yields two different strings.
    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hash(e.to_string()))
    }

    /// verify_password
    ///
    /// True iff `password` produced `hash`. The comparison inside argon2 is
    /// constant-time. A stored hash that cannot be parsed never matches.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// issue_token
    ///
    /// Signs an HS256 token for `user_id`, valid for the configured expiry window.
    pub fn issue_token(&self, user_id: Uuid) -> Result<String, CredentialError> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.token_expiry.as_secs() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(CredentialError::Encode)
    }

    /// verify_token
    ///
    /// Checks structure, signature and expiry. Anything else is `false`.
    pub fn verify_token(&self, token: &str) -> bool {
        self.decode_claims(token).is_ok()
    }

    /// decode_token
    ///
    /// Callers are expected to have run `verify_token` first. Decoding still fails
    /// closed: a token that does not verify yields `InvalidToken`, never a subject.
    pub fn decode_token(&self, token: &str) -> Result<TokenSubject, CredentialError> {
        self.decode_claims(token)
            .map(|claims| TokenSubject { id: claims.sub })
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, CredentialError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(CredentialError::InvalidToken)
    }
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("token_expiry", &self.token_expiry)
            .finish_non_exhaustive()
    }
}
