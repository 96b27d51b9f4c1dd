//! Defines the HTTP routes for authentication.
//!
//! These routes handle registration, login, logout and token refresh, and are
//! designed to be nested into the main Axum router.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::post};

/// Creates the authentication router with all auth-related routes
pub fn auth_router(max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout).layer(middleware::from_fn(jwt_auth)))
}
