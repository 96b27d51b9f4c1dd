//! Uploads local media files to the remote media host.
//!
//! Registration writes incoming files to a temporary directory; this service
//! pushes them to Cloudinary and hands back the public URL. The temporary file
//! is removed after every attempt.

use crate::config::MediaConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// Result of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
}

/// Media upload collaborator.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia>;
}

/// Unsigned-preset uploader for the Cloudinary image API.
pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: MediaConfig,
}

impl CloudinaryUploader {
    /// Creates a new CloudinaryUploader instance
    pub fn new(config: MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/auto/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    async fn send(&self, local_path: &Path) -> Result<UploadedMedia> {
        let bytes = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .context("Media host unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Media host rejected upload with {status}: {body}");
        }

        response
            .json::<UploadedMedia>()
            .await
            .context("Media host returned an unexpected response")
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia> {
        let result = self.send(local_path).await;

        if let Err(e) = tokio::fs::remove_file(local_path).await {
            tracing::warn!("Failed to remove temp file {}: {}", local_path.display(), e);
        }

        match &result {
            Ok(media) => tracing::info!("Uploaded media to {}", media.url),
            Err(e) => tracing::error!("Media upload failed: {:#}", e),
        }

        result
    }
}
