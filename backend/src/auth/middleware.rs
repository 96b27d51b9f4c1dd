//! Middleware for protecting authenticated routes.
//!
//! Accepts an access token from the `Authorization: Bearer` header or the
//! access cookie, verifies it statelessly, and exposes the claims to handlers.

use crate::api::common::error_response;
use crate::auth::cookies::{ACCESS_COOKIE_NAME, bearer_token, cookie_value};
use crate::state::AppState;
use crate::utils::jwt::TokenClass;
use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// JWT authentication middleware
pub async fn jwt_auth(mut request: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let state = request
        .extensions()
        .get::<AppState>()
        .cloned()
        .ok_or_else(|| {
            tracing::error!("AppState extension missing on guarded route");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "internal_error",
            )
        })?;

    let token = bearer_token(request.headers())
        .or_else(|| cookie_value(request.headers(), ACCESS_COOKIE_NAME))
        .ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                "Unauthorized request",
                "authentication_error",
            )
        })?;

    match state.auth.jwt_utils().verify(&token, TokenClass::Access) {
        Ok(verified) if !verified.expired => {
            // Add claims to request extensions for use in handlers
            request.extensions_mut().insert(verified.claims);
            Ok(next.run(request).await)
        }
        Ok(_) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Access token has expired",
            "invalid_token",
        )),
        Err(_) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid access token",
            "invalid_token",
        )),
    }
}
