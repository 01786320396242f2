//! Specialized image backend backed by the TinyPNG shrink API

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::backend::write_sibling;
use super::{BackendId, CompressionBackend, CompressionError};
use crate::config::ServiceConfig;

const ID: BackendId = BackendId::SpecializedImage;

/// Uploads the image, then downloads the shrunk result from the returned location
pub struct TinyPngBackend {
    http: Client,
    url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl TinyPngBackend {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CompressionError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|source| CompressionError::Transport { backend: ID, source })?;
        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn key(&self) -> Result<&str, CompressionError> {
        self.api_key.as_deref().ok_or_else(|| CompressionError::MissingCredential {
            backend: ID,
            env: self.api_key_env.clone(),
        })
    }

    async fn check(response: reqwest::Response, expected: &[StatusCode]) -> Result<reqwest::Response, CompressionError> {
        let status = response.status();
        if expected.contains(&status) {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(CompressionError::Service {
            backend: ID,
            status: status.as_u16(),
            message: message.chars().take(500).collect(),
        })
    }
}

#[async_trait]
impl CompressionBackend for TinyPngBackend {
    fn id(&self) -> BackendId {
        ID
    }

    async fn compress(&self, path: &Path) -> Result<PathBuf, CompressionError> {
        debug!(?path, "TinyPngBackend::compress: called");
        let key = self.key()?;
        let io_err = |source| CompressionError::Io {
            backend: ID,
            path: path.to_path_buf(),
            source,
        };
        let transport = |source| CompressionError::Transport { backend: ID, source };

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        let upload = self
            .http
            .post(&self.url)
            .basic_auth("api", Some(key))
            .body(bytes)
            .send()
            .await
            .map_err(transport)?;
        let upload = Self::check(upload, &[StatusCode::CREATED, StatusCode::OK]).await?;

        let location = upload
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| CompressionError::Backend {
                backend: ID,
                message: "response missing Location header".to_string(),
            })?;

        let download = self
            .http
            .get(&location)
            .basic_auth("api", Some(key))
            .send()
            .await
            .map_err(transport)?;
        let download = Self::check(download, &[StatusCode::OK]).await?;
        let shrunk = download.bytes().await.map_err(transport)?;

        let target = write_sibling(ID, path, &shrunk).await?;
        info!(?target, size = shrunk.len(), "TinyPngBackend::compress: image shrunk");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(env: &str) -> ServiceConfig {
        ServiceConfig {
            url: "http://127.0.0.1:9/shrink".to_string(),
            api_key_env: env.to_string(),
            timeout_ms: 1000,
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("photo.png");
        std::fs::write(&file, b"png").unwrap();

        let backend = TinyPngBackend::from_config(&config("AGENTFM_TEST_TINYPNG_KEY_UNSET")).unwrap();
        let err = backend.compress(&file).await.unwrap_err();
        assert!(matches!(err, CompressionError::MissingCredential { .. }));
        let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("photo.png")]);
    }

    #[test]
    fn test_id() {
        let backend = TinyPngBackend::from_config(&config("AGENTFM_TEST_TINYPNG_KEY_UNSET")).unwrap();
        assert_eq!(backend.id(), BackendId::SpecializedImage);
    }
}
