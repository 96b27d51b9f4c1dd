//! Data structures for authentication requests and responses.
//!
//! This module defines the registration and login payloads, the sanitized
//! user projection returned to clients, and the token responses.

use crate::database::models::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Registration input, assembled by the handler from a multipart form.
#[derive(Debug, Clone, Default, Validate)]
pub struct RegisterRequest {
    pub full_name: String,
    pub username: String,
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
    pub password: String,
    /// Local path of the uploaded avatar file
    pub avatar: Option<PathBuf>,
    /// Local path of the uploaded cover image file
    pub cover_image: Option<PathBuf>,
}

/// Login request payload; either `username` or `email` identifies the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "userName")]
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Token refresh request body, used when no refresh cookie is present
#[derive(Debug, Default, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// User fields that are safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login response containing tokens and user info
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiration in seconds
    pub expires_in: u64,
}
