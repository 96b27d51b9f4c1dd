//! JWT token utilities for session authentication.
//!
//! Two classes of HS256 tokens are issued, each with its own secret: short-lived
//! access tokens and long-lived refresh tokens. Both carry only the user
//! identifier plus timing claims. Secrets are supplied once at construction.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Unique token ID
    pub jti: String,
    /// Token issued at timestamp
    pub iat: usize,
    /// Token expiration timestamp
    pub exp: usize,
}

/// Which secret a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Access,
    Refresh,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Outcome of a successful signature check.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: String,
    pub expired: bool,
    pub claims: Claims,
}

/// Freshly minted access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Secrets and lifetimes for both token classes.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            access_ttl: Duration::seconds(config.access_token_expires_in_seconds as i64),
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_ttl: Duration::days(config.refresh_token_expires_in_days as i64),
        }
    }
}

struct KeyPair {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// JWT token utility for creating and validating tokens
#[derive(Clone)]
pub struct JwtUtils {
    access: std::sync::Arc<KeyPair>,
    refresh: std::sync::Arc<KeyPair>,
    validation: Validation,
}

impl JwtUtils {
    pub fn new(settings: &TokenSettings) -> Self {
        // Expiry is reported back to the caller instead of being a decode failure.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        JwtUtils {
            access: std::sync::Arc::new(KeyPair::new(&settings.access_secret, settings.access_ttl)),
            refresh: std::sync::Arc::new(KeyPair::new(
                &settings.refresh_secret,
                settings.refresh_ttl,
            )),
            validation,
        }
    }

    fn keys(&self, class: TokenClass) -> &KeyPair {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    fn issue(&self, user_id: &str, class: TokenClass) -> Result<String, TokenError> {
        let keys = self.keys(class);
        let now = Utc::now();
        let exp = now + keys.ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::now_v7().to_string(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp().max(0) as usize,
        };

        encode(&Header::default(), &claims, &keys.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Generate a short-lived access token
    pub fn issue_access_token(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue(user_id, TokenClass::Access)
    }

    /// Generate a refresh token (longer expiration)
    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue(user_id, TokenClass::Refresh)
    }

    /// Generate both tokens for a user
    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user_id)?,
            refresh_token: self.issue_refresh_token(user_id)?,
            expires_in: self.access_ttl_seconds(),
        })
    }

    /// Check the signature of a token against the secret of `class`.
    ///
    /// Expiry does not fail verification; it is reported in [`VerifiedToken::expired`].
    pub fn verify(&self, token: &str, class: TokenClass) -> Result<VerifiedToken, TokenError> {
        let claims = decode::<Claims>(token, &self.keys(class).decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|_| TokenError::InvalidSignature)?;

        Ok(VerifiedToken {
            user_id: claims.sub.clone(),
            expired: claims.is_expired(),
            claims,
        })
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.access.ttl.num_seconds().max(0) as u64
    }

    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.refresh.ttl.num_seconds().max(0) as u64
    }
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Check if token has expired
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as usize;
        self.exp < now
    }
}
