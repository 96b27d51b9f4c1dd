//! Shared application state handed to handlers through an `Extension`.

use crate::auth::cookies::CookieSettings;
use crate::auth::service::AuthService;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub cookies: CookieSettings,
    /// Directory incoming multipart files are written to before upload
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(auth: AuthService, cookies: CookieSettings, upload_dir: PathBuf) -> Self {
        Self {
            auth: Arc::new(auth),
            cookies,
            upload_dir,
        }
    }
}
