//! Persistence layer.
//!
//! [`CredentialStore`] is the seam the session service talks to; the SQLite
//! implementation lives in [`user_repository`].

use crate::database::models::{CreateUser, User};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub mod user_repository;

/// Raised through `anyhow` when an insert hits a unique username or email.
#[derive(Debug, Error)]
#[error("username or email already registered")]
pub struct DuplicateIdentity;

/// Lookup and update primitives over stored user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds a user whose username or email matches either supplied value.
    async fn find_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// `true` if either value is already taken.
    async fn identity_exists(&self, username: &str, email: &str) -> Result<bool>;

    /// Persists a new user. Fails with [`DuplicateIdentity`] on a uniqueness violation.
    async fn insert(&self, user: CreateUser) -> Result<User>;

    /// Unconditionally sets (or clears) the stored refresh token.
    async fn update_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()>;

    /// Replaces the stored refresh token only if it still equals `expected`.
    ///
    /// Returns `false` when the stored value had already changed.
    async fn swap_refresh_token(&self, id: &str, expected: &str, new: &str) -> Result<bool>;
}
