//! Media host adapter: uploads locally staged files and returns durable URLs.
//!
//! The adapter contract is deliberately narrow: `None` signals failure,
//! whether the transport errored or the host returned no URL. Call sites
//! treat both the same way.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tracing::{error, instrument};

/// Result contract of a successful upload.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload a locally staged file and return its durable URL, or `None`
    /// when the media host could not produce one.
    async fn upload(&self, local_path: &Path) -> Option<UploadedMedia>;
}

/// Uploads via HTTP multipart to the media host's `/upload` endpoint.
pub struct HttpMediaUploader {
    client: Client,
    base_url: String,
}

impl HttpMediaUploader {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MediaUploader for HttpMediaUploader {
    #[instrument(skip(self))]
    async fn upload(&self, local_path: &Path) -> Option<UploadedMedia> {
        let bytes = match tokio::fs::read(local_path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Failed to read staged file {}: {err}", local_path.display());
                return None;
            }
        };

        let file_name = local_path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = match self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("Media host upload request failed: {err}");
                return None;
            }
        };

        if !response.status().is_success() {
            error!("Media host rejected upload: {}", response.status());
            return None;
        }

        match response.json::<UploadedMedia>().await {
            Ok(media) if !media.url.is_empty() => Some(media),
            Ok(_) => {
                error!("Media host returned an empty URL");
                None
            }
            Err(err) => {
                error!("Failed to decode media host response: {err}");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let uploader = HttpMediaUploader::new("https://media.test/".to_string()).expect("client");
        assert_eq!(uploader.base_url, "https://media.test");
    }

    #[tokio::test]
    async fn missing_file_maps_to_none() {
        let uploader = HttpMediaUploader::new("https://media.test".to_string()).expect("client");
        let result = uploader.upload(Path::new("/nonexistent/file.png")).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staged = dir.path().join("avatar.png");
        std::fs::write(&staged, b"png bytes").expect("write staged file");

        // Port 1 refuses the connection; the failure must stay internal.
        let uploader = HttpMediaUploader::new("http://127.0.0.1:1".to_string()).expect("client");
        assert!(uploader.upload(&staged).await.is_none());
    }
}
