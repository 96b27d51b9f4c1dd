//! Core business logic for the authentication system.
//!
//! `AuthService` owns the session lifecycle: registration, login, logout and
//! refresh-token rotation. Session truth lives only in the stored
//! `refresh_token` column; the service itself keeps no mutable state, so one
//! instance is shared by all requests.

use crate::auth::models::*;
use crate::database::models::CreateUser;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::{CredentialStore, DuplicateIdentity};
use crate::services::media_service::MediaUploader;
use crate::utils::jwt::{JwtUtils, TokenClass, TokenError, TokenPair};
use crate::utils::password::PasswordHasher;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Authentication service for handling registration, login and token rotation
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    uploader: Arc<dyn MediaUploader>,
    jwt_utils: JwtUtils,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        uploader: Arc<dyn MediaUploader>,
        jwt_utils: JwtUtils,
    ) -> Self {
        AuthService {
            store,
            hasher,
            uploader,
            jwt_utils,
        }
    }

    pub fn jwt_utils(&self) -> &JwtUtils {
        &self.jwt_utils
    }

    /// Register a new user and return its sanitized profile.
    ///
    /// # Errors
    /// - `Validation` if a required field is blank or the email is malformed
    /// - `Conflict` if the username or email is taken
    /// - `Dependency` if the avatar is missing or an upload fails
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<UserProfile> {
        if [
            &request.full_name,
            &request.username,
            &request.email,
            &request.password,
        ]
        .iter()
        .any(|field| field.trim().is_empty())
        {
            return Err(ServiceError::validation("All fields are required"));
        }

        let request = RegisterRequest {
            full_name: request.full_name.trim().to_string(),
            username: request.username.trim().to_lowercase(),
            email: request.email.trim().to_lowercase(),
            ..request
        };

        if let Err(validation_errors) = request.validate() {
            let error_messages: Vec<String> = validation_errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |error| {
                        format!(
                            "{}: {}",
                            field,
                            error.message.as_ref().unwrap_or(&"Invalid value".into())
                        )
                    })
                })
                .collect();
            return Err(ServiceError::validation(error_messages.join(", ")));
        }

        if self
            .store
            .identity_exists(&request.username, &request.email)
            .await?
        {
            return Err(ServiceError::conflict(
                "User",
                format!("{} / {}", request.username, request.email),
            ));
        }

        let avatar_path = request
            .avatar
            .as_deref()
            .ok_or_else(|| ServiceError::dependency("Avatar file is required"))?;

        let avatar = self
            .uploader
            .upload(avatar_path)
            .await
            .map_err(|e| ServiceError::dependency(format!("Error uploading avatar: {e}")))?;

        let cover_image_url = match request.cover_image.as_deref() {
            Some(path) => Some(
                self.uploader
                    .upload(path)
                    .await
                    .map_err(|e| {
                        ServiceError::dependency(format!("Error uploading cover image: {e}"))
                    })?
                    .url,
            ),
            None => None,
        };

        let password_hash = self.hasher.hash(&request.password).map_err(|e| {
            tracing::error!("Password hashing failed: {:#}", e);
            ServiceError::internal_error("Error while registering the user")
        })?;

        let data = CreateUser {
            id: Uuid::now_v7().to_string(),
            full_name: request.full_name,
            username: request.username.clone(),
            email: request.email.clone(),
            password_hash,
            avatar_url: avatar.url,
            cover_image_url,
        };

        let user = match self.store.insert(data).await {
            Ok(user) => user,
            Err(e) if e.is::<DuplicateIdentity>() => {
                return Err(ServiceError::conflict(
                    "User",
                    format!("{} / {}", request.username, request.email),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Registered user {}", user.id);
        Ok(UserProfile::from(user))
    }

    /// Authenticate user and start a new session.
    ///
    /// Any previously stored refresh token is overwritten, which ends the
    /// prior session.
    pub async fn login(&self, login_request: LoginRequest) -> ServiceResult<LoginResponse> {
        let username = normalize_identity(login_request.username.as_deref());
        let email = normalize_identity(login_request.email.as_deref());

        if username.is_none() && email.is_none() {
            return Err(ServiceError::validation("Username or email is required"));
        }
        if login_request.password.is_empty() {
            return Err(ServiceError::validation("Password is required"));
        }

        let identity = username.clone().or_else(|| email.clone()).unwrap_or_default();
        let user = self
            .store
            .find_by_identity(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| ServiceError::not_found("User", identity))?;

        let password_valid = self
            .hasher
            .verify(&login_request.password, &user.password_hash)
            .map_err(|e| {
                tracing::error!("Password verification failed for user {}: {:#}", user.id, e);
                ServiceError::internal_error("Password verification failed")
            })?;

        if !password_valid {
            tracing::info!("Rejected login for user {}: wrong password", user.id);
            return Err(ServiceError::authentication("Invalid password"));
        }

        let tokens = self.generate_tokens(&user.id)?;

        self.store
            .update_refresh_token(&user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::info!("User {} logged in", user.id);

        Ok(LoginResponse {
            user: UserProfile::from(user),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        })
    }

    /// End the session of `user_id`. Clearing an already cleared session succeeds.
    pub async fn logout(&self, user_id: &str) -> ServiceResult<()> {
        self.store.update_refresh_token(user_id, None).await?;
        tracing::info!("User {} logged out", user_id);
        Ok(())
    }

    /// Exchange a refresh token for a new pair, rotating the stored token.
    ///
    /// The presented token must verify, be unexpired, and still be the value
    /// stored for its user. The final write is a compare-and-swap against the
    /// presented value, so of several concurrent calls with the same token at
    /// most one succeeds.
    pub async fn refresh(&self, presented: Option<&str>) -> ServiceResult<TokenPair> {
        let presented = presented
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ServiceError::authentication("Refresh token is required"))?;

        let verified = self
            .jwt_utils
            .verify(presented, TokenClass::Refresh)
            .map_err(|_| ServiceError::invalid_token("Invalid refresh token"))?;

        if verified.expired {
            return Err(ServiceError::invalid_token("Refresh token has expired"));
        }

        let user = self
            .store
            .find_by_id(&verified.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &verified.user_id))?;

        if user.refresh_token.as_deref() != Some(presented) {
            tracing::warn!("Stale refresh token presented for user {}", user.id);
            return Err(ServiceError::token_reuse(&user.id));
        }

        let tokens = self.generate_tokens(&user.id)?;

        let rotated = self
            .store
            .swap_refresh_token(&user.id, presented, &tokens.refresh_token)
            .await?;

        if !rotated {
            tracing::warn!("Refresh token for user {} rotated concurrently", user.id);
            return Err(ServiceError::token_reuse(&user.id));
        }

        tracing::info!("Rotated refresh token for user {}", user.id);
        Ok(tokens)
    }

    fn generate_tokens(&self, user_id: &str) -> ServiceResult<TokenPair> {
        self.jwt_utils.issue_pair(user_id).map_err(|e: TokenError| {
            tracing::error!("Token generation failed for user {}: {}", user_id, e);
            ServiceError::internal_error(
                "Something went wrong while generating refresh and access token",
            )
        })
    }
}

/// Trims and lowercases an identity value, dropping it if blank.
fn normalize_identity(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::Database;
    use crate::repositories::user_repository::UserRepository;
    use crate::services::media_service::UploadedMedia;
    use crate::utils::jwt::TokenSettings;
    use crate::utils::password::BcryptHasher;
    use anyhow::bail;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-process stand-in for the media host.
    #[derive(Default)]
    pub(crate) struct FakeUploader {
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaUploader for FakeUploader {
        async fn upload(&self, local_path: &Path) -> anyhow::Result<UploadedMedia> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("media host unavailable");
            }
            Ok(UploadedMedia {
                url: format!("https://media.example/{}", local_path.display()),
            })
        }
    }

    pub(crate) fn token_settings() -> TokenSettings {
        TokenSettings {
            access_secret: "test-access-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_secret: "test-refresh-secret".to_string(),
            refresh_ttl: Duration::days(10),
        }
    }

    pub(crate) async fn service_with(
        uploader: Arc<FakeUploader>,
        settings: TokenSettings,
    ) -> (AuthService, Arc<UserRepository>) {
        service_on(Database::in_memory().await, uploader, settings)
    }

    fn service_on(
        db: Database,
        uploader: Arc<FakeUploader>,
        settings: TokenSettings,
    ) -> (AuthService, Arc<UserRepository>) {
        let store = Arc::new(UserRepository::new(db.pool().clone()));
        let service = AuthService::new(
            store.clone(),
            Arc::new(BcryptHasher::new(4)),
            uploader,
            JwtUtils::new(&settings),
        );
        (service, store)
    }

    async fn service() -> (AuthService, Arc<UserRepository>) {
        service_with(Arc::new(FakeUploader::default()), token_settings()).await
    }

    pub(crate) fn alice() -> RegisterRequest {
        RegisterRequest {
            full_name: "Alice Liddell".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "Secret123!".to_string(),
            avatar: Some(PathBuf::from("alice.png")),
            cover_image: None,
        }
    }

    fn login_alice(password: &str) -> LoginRequest {
        LoginRequest {
            username: Some("alice".to_string()),
            email: None,
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_returns_sanitized_profile() {
        let (service, store) = service().await;

        let profile = service.register(alice()).await.unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.avatar_url, "https://media.example/alice.png");

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());

        let stored = store.find_by_id(&profile.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "Secret123!");
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_register_normalizes_identity_and_uploads_cover() {
        let (service, _) = service().await;

        let profile = service
            .register(RegisterRequest {
                username: "  Alice ".to_string(),
                email: "Alice@Example.COM".to_string(),
                cover_image: Some(PathBuf::from("cover.png")),
                ..alice()
            })
            .await
            .unwrap();

        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(
            profile.cover_image_url.as_deref(),
            Some("https://media.example/cover.png")
        );
    }

    #[tokio::test]
    async fn test_register_conflicts_on_taken_handle_or_email() {
        let (service, _) = service().await;
        service.register(alice()).await.unwrap();

        let same_handle = RegisterRequest {
            email: "someone@example.com".to_string(),
            full_name: "Other".to_string(),
            ..alice()
        };
        assert!(matches!(
            service.register(same_handle).await,
            Err(ServiceError::Conflict { .. })
        ));

        let same_email = RegisterRequest {
            username: "ALICE2".to_string(),
            email: "ALICE@example.com".to_string(),
            ..alice()
        };
        assert!(matches!(
            service.register(same_email).await,
            Err(ServiceError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_fields() {
        let (service, _) = service().await;

        for request in [
            RegisterRequest {
                full_name: "   ".to_string(),
                ..alice()
            },
            RegisterRequest {
                username: String::new(),
                ..alice()
            },
            RegisterRequest {
                password: " \t".to_string(),
                ..alice()
            },
            RegisterRequest {
                email: "not-an-email".to_string(),
                ..alice()
            },
        ] {
            assert!(matches!(
                service.register(request).await,
                Err(ServiceError::Validation { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_register_requires_avatar_and_working_uploader() {
        let (service, store) = service().await;
        let missing_avatar = RegisterRequest {
            avatar: None,
            ..alice()
        };
        assert!(matches!(
            service.register(missing_avatar).await,
            Err(ServiceError::Dependency { .. })
        ));

        let failing = Arc::new(FakeUploader {
            fail: true,
            ..Default::default()
        });
        let (broken, broken_store) = service_with(failing.clone(), token_settings()).await;
        assert!(matches!(
            broken.register(alice()).await,
            Err(ServiceError::Dependency { .. })
        ));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

        assert!(!store.identity_exists("alice", "alice@example.com").await.unwrap());
        assert!(
            !broken_store
                .identity_exists("alice", "alice@example.com")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_login_stores_returned_refresh_token() {
        let (service, store) = service().await;
        service.register(alice()).await.unwrap();

        let response = service.login(login_alice("Secret123!")).await.unwrap();
        assert_eq!(response.user.username, "alice");
        assert!(!response.access_token.is_empty());

        let json = serde_json::to_value(&response.user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());

        let stored = store.find_by_id(&response.user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some(response.refresh_token.as_str())
        );

        let access = service
            .jwt_utils()
            .verify(&response.access_token, TokenClass::Access)
            .unwrap();
        assert_eq!(access.user_id, response.user.id);
    }

    #[tokio::test]
    async fn test_login_by_email() {
        let (service, _) = service().await;
        service.register(alice()).await.unwrap();

        let response = service
            .login(LoginRequest {
                username: None,
                email: Some("Alice@Example.com".to_string()),
                password: "Secret123!".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (service, _) = service().await;
        service.register(alice()).await.unwrap();

        assert!(matches!(
            service.login(login_alice("wrong")).await,
            Err(ServiceError::Authentication { .. })
        ));

        assert!(matches!(
            service
                .login(LoginRequest {
                    username: Some("bob".to_string()),
                    email: None,
                    password: "Secret123!".to_string(),
                })
                .await,
            Err(ServiceError::NotFound { .. })
        ));

        assert!(matches!(
            service
                .login(LoginRequest {
                    username: Some("  ".to_string()),
                    email: None,
                    password: "Secret123!".to_string(),
                })
                .await,
            Err(ServiceError::Validation { .. })
        ));

        assert!(matches!(
            service.login(login_alice("")).await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_new_login_replaces_previous_session() {
        let (service, _) = service().await;
        service.register(alice()).await.unwrap();

        let first = service.login(login_alice("Secret123!")).await.unwrap();
        let second = service.login(login_alice("Secret123!")).await.unwrap();

        assert!(matches!(
            service.refresh(Some(&first.refresh_token)).await,
            Err(ServiceError::TokenReuse { .. })
        ));
        assert!(service.refresh(Some(&second.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let (service, store) = service().await;
        service.register(alice()).await.unwrap();
        let session = service.login(login_alice("Secret123!")).await.unwrap();
        let r1 = session.refresh_token;

        let rotated = service.refresh(Some(&r1)).await.unwrap();
        let r2 = rotated.refresh_token.clone();
        assert_ne!(r1, r2);

        let stored = store.find_by_id(&session.user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(r2.as_str()));

        assert!(matches!(
            service.refresh(Some(&r1)).await,
            Err(ServiceError::TokenReuse { .. })
        ));

        // The replay attempt does not disturb the live session.
        assert!(service.refresh(Some(&r2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_and_is_idempotent() {
        let (service, store) = service().await;
        service.register(alice()).await.unwrap();
        let session = service.login(login_alice("Secret123!")).await.unwrap();

        service.logout(&session.user.id).await.unwrap();
        service.logout(&session.user.id).await.unwrap();
        service.logout("no-such-user").await.unwrap();

        let stored = store.find_by_id(&session.user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());

        assert!(matches!(
            service.refresh(Some(&session.refresh_token)).await,
            Err(ServiceError::TokenReuse { .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_missing_and_invalid_tokens() {
        let (service, _) = service().await;
        service.register(alice()).await.unwrap();
        let session = service.login(login_alice("Secret123!")).await.unwrap();

        assert!(matches!(
            service.refresh(None).await,
            Err(ServiceError::Authentication { .. })
        ));
        assert!(matches!(
            service.refresh(Some("")).await,
            Err(ServiceError::Authentication { .. })
        ));
        assert!(matches!(
            service.refresh(Some("garbage")).await,
            Err(ServiceError::InvalidToken { .. })
        ));
        assert!(matches!(
            service.refresh(Some(&session.access_token)).await,
            Err(ServiceError::InvalidToken { .. })
        ));

        let orphan = service.jwt_utils().issue_refresh_token("ghost").unwrap();
        assert!(matches!(
            service.refresh(Some(&orphan)).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_invalid_even_when_stored() {
        let settings = TokenSettings {
            refresh_ttl: Duration::seconds(-60),
            ..token_settings()
        };
        let (service, store) = service_with(Arc::new(FakeUploader::default()), settings).await;
        service.register(alice()).await.unwrap();
        let session = service.login(login_alice("Secret123!")).await.unwrap();

        let stored = store.find_by_id(&session.user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some(session.refresh_token.as_str())
        );

        assert!(matches!(
            service.refresh(Some(&session.refresh_token)).await,
            Err(ServiceError::InvalidToken { .. })
        ));
    }

    async fn race_refreshes(
        service: AuthService,
        store: Arc<UserRepository>,
        callers: usize,
    ) {
        service.register(alice()).await.unwrap();
        let session = service.login(login_alice("Secret123!")).await.unwrap();

        let service = Arc::new(service);
        let handles = (0..callers).map(|_| {
            let service = service.clone();
            let token = session.refresh_token.clone();
            tokio::spawn(async move { service.refresh(Some(&token)).await })
        });

        let results: Vec<ServiceResult<TokenPair>> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners: Vec<&TokenPair> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(ServiceError::TokenReuse { .. })))
                .count(),
            callers - 1
        );

        let stored = store.find_by_id(&session.user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_token.as_deref(),
            Some(winners[0].refresh_token.as_str())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_has_single_winner() {
        let (service, store) = service().await;
        race_refreshes(service, store, 8).await;
    }

    // Several pooled connections let the lookups and updates of different
    // callers interleave, so only the conditional update keeps one winner.
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_refresh_across_connections_has_single_winner() {
        let db = Database::temp_file(5).await;
        let (service, store) =
            service_on(db, Arc::new(FakeUploader::default()), token_settings());
        race_refreshes(service, store, 32).await;
    }
}
