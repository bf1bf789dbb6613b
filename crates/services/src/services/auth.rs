//! Token issuance and validation for the single admin principal.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ACCESS_SUBJECT: &str = "access";
pub const REFRESH_SUBJECT: &str = "refresh";

const ACCESS_TTL_DAYS: i64 = 7;
const REFRESH_TTL_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid refresh token")]
    InvalidRefresh,
    #[error("Failed to sign token")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The single configured principal; compared verbatim at login.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Stateless issuer and verifier of HMAC-signed bearer tokens. Validation is
/// pinned to HS256, so a token claiming any other algorithm fails decoding
/// outright. There is no revocation: a leaked token stays valid until expiry.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<TokenKeys>,
}

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access: Validation,
    refresh: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            inner: Arc::new(TokenKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                access: subject_validation(ACCESS_SUBJECT),
                refresh: subject_validation(REFRESH_SUBJECT),
            }),
        }
    }

    pub fn issue_pair(&self) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.sign(ACCESS_SUBJECT, ACCESS_TTL_DAYS)?,
            refresh_token: self.sign(REFRESH_SUBJECT, REFRESH_TTL_DAYS)?,
        })
    }

    /// True when the token parses, the HMAC verifies, the expiry is in the
    /// future, and the subject is the access subject.
    pub fn validate_access(&self, token: &str) -> bool {
        jsonwebtoken::decode::<Claims>(token, &self.inner.decoding, &self.inner.access).is_ok()
    }

    /// Exchanges a refresh token for a fresh access token. Anything that is
    /// not a live refresh token, including a valid access token, is rejected.
    pub fn regenerate_access(&self, refresh: &str) -> Result<String, AuthError> {
        jsonwebtoken::decode::<Claims>(refresh, &self.inner.decoding, &self.inner.refresh)
            .map_err(|_| AuthError::InvalidRefresh)?;
        self.sign(ACCESS_SUBJECT, ACCESS_TTL_DAYS)
    }

    fn sign(&self, subject: &str, ttl_days: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(ttl_days)).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )?)
    }
}

fn subject_validation(subject: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);
    validation.sub = Some(subject.to_string());
    validation
}

/// Login and refresh on top of the token service.
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<AdminCredentials>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(credentials: AdminCredentials, tokens: TokenService) -> Self {
        Self {
            credentials: Arc::new(credentials),
            tokens,
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        if username != self.credentials.username || password != self.credentials.password {
            return Err(AuthError::InvalidCredentials);
        }
        self.tokens.issue_pair()
    }

    pub fn validate_access(&self, token: &str) -> bool {
        self.tokens.validate_access(token)
    }

    pub fn regenerate_access(&self, refresh: &str) -> Result<String, AuthError> {
        self.tokens.regenerate_access(refresh)
    }
}
