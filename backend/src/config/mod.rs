//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, token signing secrets and lifetimes, the
//! temporary upload directory, and media host credentials.

use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub access_token_secret: String,
    pub access_token_expires_in_seconds: u64,
    pub refresh_token_secret: String,
    pub refresh_token_expires_in_days: u64,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub media: MediaConfig,
    pub secure_cookies: bool,
}

/// Settings for the remote media host used for avatar and cover uploads.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_base: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} not set"));
        let with_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = required("DATABASE_URL")?;

        let max_connections = with_default("DB_MAX_CONNECTIONS", "5")
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = with_default("DB_ACQUIRE_TIMEOUT_SECONDS", "3")
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let access_token_secret = required("ACCESS_TOKEN_SECRET")?;

        let access_token_expires_in_seconds = with_default("ACCESS_TOKEN_EXPIRES_IN_SECONDS", "900")
            .parse::<u64>()
            .context("ACCESS_TOKEN_EXPIRES_IN_SECONDS must be a valid number")?;

        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?;

        let refresh_token_expires_in_days = with_default("REFRESH_TOKEN_EXPIRES_IN_DAYS", "10")
            .parse::<u64>()
            .context("REFRESH_TOKEN_EXPIRES_IN_DAYS must be a valid number")?;

        if access_token_secret == refresh_token_secret {
            bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }

        let server_port = with_default("SERVER_PORT", "8000")
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let upload_dir = PathBuf::from(with_default("UPLOAD_DIR", "./public/temp"));

        let max_upload_bytes = with_default("MAX_UPLOAD_BYTES", "10485760")
            .parse::<usize>()
            .context("MAX_UPLOAD_BYTES must be a valid number")?;

        let media = MediaConfig {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
            api_base: with_default("CLOUDINARY_API_BASE", "https://api.cloudinary.com/v1_1"),
        };

        let secure_cookies = with_default("SECURE_COOKIES", "true")
            .parse::<bool>()
            .context("SECURE_COOKIES must be true or false")?;

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            access_token_secret,
            access_token_expires_in_seconds,
            refresh_token_secret,
            refresh_token_expires_in_days,
            server_port,
            upload_dir,
            max_upload_bytes,
            media,
            secure_cookies,
        })
    }
}
