//! Session cookie construction and token extraction from request headers.

use axum::http::{
    HeaderMap, HeaderName,
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
};
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Attributes applied to both session cookies.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
    pub access_max_age_seconds: u64,
    pub refresh_max_age_seconds: u64,
}

fn build_cookie(name: &str, value: &str, secure: bool, max_age_seconds: i64) -> String {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .path("/")
        .build()
        .to_string()
}

/// `Set-Cookie` headers delivering a fresh token pair.
pub fn session_cookies(
    settings: &CookieSettings,
    access_token: &str,
    refresh_token: &str,
) -> [(HeaderName, String); 2] {
    [
        (
            SET_COOKIE,
            build_cookie(
                ACCESS_COOKIE_NAME,
                access_token,
                settings.secure,
                settings.access_max_age_seconds as i64,
            ),
        ),
        (
            SET_COOKIE,
            build_cookie(
                REFRESH_COOKIE_NAME,
                refresh_token,
                settings.secure,
                settings.refresh_max_age_seconds as i64,
            ),
        ),
    ]
}

/// `Set-Cookie` headers that expire both session cookies.
pub fn cleared_cookies(settings: &CookieSettings) -> [(HeaderName, String); 2] {
    [
        (
            SET_COOKIE,
            build_cookie(ACCESS_COOKIE_NAME, "", settings.secure, 0),
        ),
        (
            SET_COOKIE,
            build_cookie(REFRESH_COOKIE_NAME, "", settings.secure, 0),
        ),
    ]
}

/// Value of the cookie called `name`, if present and non-empty.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for part in raw.split(';') {
            if let Ok(parsed) = Cookie::parse(part.trim().to_string()) {
                if parsed.name() == name && !parsed.value().is_empty() {
                    return Some(parsed.value().to_string());
                }
            }
        }
    }
    None
}

/// Token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
