//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse incoming HTTP requests (multipart registration, JSON
//! login, cookie or body refresh tokens), call `AuthService`, and deliver the
//! resulting tokens as HttpOnly cookies alongside the JSON body.

use crate::api::common::{ApiResponse, error_response, service_error_to_http};
use crate::auth::cookies::{REFRESH_COOKIE_NAME, cleared_cookies, cookie_value, session_cookies};
use crate::auth::models::*;
use crate::state::AppState;
use crate::utils::jwt::{Claims, TokenPair};
use axum::{
    body::Bytes,
    extract::{Extension, Json, Multipart, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Handle user registration (multipart form with avatar upload)
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), (StatusCode, String)> {
    let mut temp_files = Vec::new();

    let request = match read_register_form(multipart, &state.upload_dir, &mut temp_files).await {
        Ok(request) => request,
        Err(rejection) => {
            discard_temp_files(&temp_files).await;
            return Err(rejection);
        }
    };

    let result = state.auth.register(request).await;
    discard_temp_files(&temp_files).await;

    match result {
        Ok(profile) => Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(profile, "User registered successfully")),
        )),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, (StatusCode, String)> {
    match state.auth.login(payload).await {
        Ok(response) => {
            let cookies = session_cookies(
                &state.cookies,
                &response.access_token,
                &response.refresh_token,
            );
            Ok((
                AppendHeaders(cookies),
                Json(ApiResponse::success(response, "User logged in successfully")),
            )
                .into_response())
        }
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle logout request; clears the stored refresh token and both cookies
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, (StatusCode, String)> {
    if let Err(error) = state.auth.logout(claims.user_id()).await {
        return Err(service_error_to_http(error));
    }

    Ok((
        AppendHeaders(cleared_cookies(&state.cookies)),
        Json(ApiResponse::success(
            serde_json::json!({}),
            "User logged out",
        )),
    )
        .into_response())
}

/// Handle token refresh request; the refresh cookie takes precedence over the body
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    let presented = match cookie_value(&headers, REFRESH_COOKIE_NAME) {
        Some(token) => Some(token),
        None if body.is_empty() => None,
        None => serde_json::from_slice::<RefreshTokenRequest>(&body)
            .map_err(|e| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid request body: {e}"),
                    "validation_error",
                )
            })?
            .refresh_token,
    };

    match state.auth.refresh(presented.as_deref()).await {
        Ok(tokens) => {
            let cookies =
                session_cookies(&state.cookies, &tokens.access_token, &tokens.refresh_token);
            Ok((
                AppendHeaders(cookies),
                Json(ApiResponse::<TokenPair>::success(
                    tokens,
                    "Access token refreshed",
                )),
            )
                .into_response())
        }
        Err(error) => Err(service_error_to_http(error)),
    }
}

fn form_error(error: MultipartError) -> (StatusCode, String) {
    error_response(error.status(), error.body_text(), "validation_error")
}

/// Reads the registration form, writing file parts into `upload_dir`.
///
/// Every file written is pushed onto `temp_files` so the caller can clean up.
async fn read_register_form(
    mut multipart: Multipart,
    upload_dir: &Path,
    temp_files: &mut Vec<PathBuf>,
) -> Result<RegisterRequest, (StatusCode, String)> {
    let mut request = RegisterRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "full_name" | "fullName" => request.full_name = field.text().await.map_err(form_error)?,
            "username" | "userName" => request.username = field.text().await.map_err(form_error)?,
            "email" => request.email = field.text().await.map_err(form_error)?,
            "password" => request.password = field.text().await.map_err(form_error)?,
            "avatar" | "cover_image" | "coverImage" => {
                let file_name = temp_file_name(field.file_name());
                let data = field.bytes().await.map_err(form_error)?;
                if data.is_empty() {
                    continue;
                }

                let path = upload_dir.join(file_name);
                tokio::fs::write(&path, &data).await.map_err(|e| {
                    tracing::error!("Failed to store upload {}: {}", path.display(), e);
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error",
                        "internal_error",
                    )
                })?;
                temp_files.push(path.clone());

                if name == "avatar" {
                    request.avatar = Some(path);
                } else {
                    request.cover_image = Some(path);
                }
            }
            other => tracing::debug!("Ignoring unexpected form field {}", other),
        }
    }

    Ok(request)
}

/// Generated name for a temp upload, keeping a sanitized extension.
fn temp_file_name(original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}{}", Uuid::now_v7(), extension)
}

async fn discard_temp_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove temp file {}: {}", path.display(), e),
        }
    }
}
