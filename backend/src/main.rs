//! Main entry point for the session authentication backend.
//!
//! This file initializes tracing, loads configuration, opens the database,
//! wires the collaborators into `AuthService`, and serves the Axum router.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod state;
mod utils;

use crate::api::common::ApiResponse;
use crate::auth::cookies::CookieSettings;
use crate::auth::service::AuthService;
use crate::repositories::user_repository::UserRepository;
use crate::services::media_service::CloudinaryUploader;
use crate::state::AppState;
use crate::utils::jwt::{JwtUtils, TokenSettings};
use crate::utils::password::BcryptHasher;
use anyhow::{Context, Result};
use axum::{Extension, Router, response::Json, routing::get};
use config::Config;
use database::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() -> Result<()> {
    init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let jwt_utils = JwtUtils::new(&TokenSettings::from_config(&config));
    let cookies = CookieSettings {
        secure: config.secure_cookies,
        access_max_age_seconds: jwt_utils.access_ttl_seconds(),
        refresh_max_age_seconds: jwt_utils.refresh_ttl_seconds(),
    };

    let auth_service = AuthService::new(
        Arc::new(UserRepository::new(db.pool().clone())),
        Arc::new(BcryptHasher::default()),
        Arc::new(CloudinaryUploader::new(config.media.clone())),
        jwt_utils,
    );
    let state = AppState::new(auth_service, cookies, config.upload_dir.clone());

    let app = Router::new()
        .route("/", get(root_handler))
        .nest(
            "/api/v1/users",
            auth::routes::auth_router(config.max_upload_bytes),
        )
        .layer(Extension(state));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    info!("Starting session auth server on port {}", config.server_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "Session Auth Backend",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the session auth API",
    ))
}
