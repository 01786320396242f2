//! Specialized document backend backed by the ConvertAPI compress endpoint

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::backend::write_sibling;
use super::{BackendId, CompressionBackend, CompressionError};
use crate::config::ServiceConfig;

const ID: BackendId = BackendId::SpecializedDocument;

/// Sends the document inline as base64 and writes the returned file
pub struct ConvertApiBackend {
    http: Client,
    url: String,
    api_key: Option<String>,
    api_key_env: String,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(rename = "Files", default)]
    files: Vec<ConvertedFile>,
}

#[derive(Debug, Deserialize)]
struct ConvertedFile {
    #[serde(rename = "FileData")]
    file_data: String,
}

impl ConvertApiBackend {
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

    fn build_payload(file_name: &str, bytes: &[u8]) -> Value {
        json!({
            "Parameters": [{
                "Name": "File",
                "FileValue": {
                    "Name": file_name,
                    "Data": general_purpose::STANDARD.encode(bytes),
                }
            }]
        })
    }

    fn decode_response(body: &str) -> Result<Vec<u8>, CompressionError> {
        let backend_err = |message: String| CompressionError::Backend { backend: ID, message };
        let parsed: ConvertResponse =
            serde_json::from_str(body).map_err(|e| backend_err(format!("unreadable response: {}", e)))?;
        let first = parsed
            .files
            .into_iter()
            .next()
            .ok_or_else(|| backend_err("response contained no files".to_string()))?;
        general_purpose::STANDARD
            .decode(first.file_data.as_bytes())
            .map_err(|e| backend_err(format!("invalid file data: {}", e)))
    }
}

#[async_trait]
impl CompressionBackend for ConvertApiBackend {
    fn id(&self) -> BackendId {
        ID
    }

    async fn compress(&self, path: &Path) -> Result<PathBuf, CompressionError> {
        debug!(?path, "ConvertApiBackend::compress: called");
        let key = self.api_key.as_deref().ok_or_else(|| CompressionError::MissingCredential {
            backend: ID,
            env: self.api_key_env.clone(),
        })?;
        let io_err = |source| CompressionError::Io {
            backend: ID,
            path: path.to_path_buf(),
            source,
        };
        let transport = |source| CompressionError::Transport { backend: ID, source };

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(key)
            .json(&Self::build_payload(&file_name, &bytes))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(CompressionError::Service {
                backend: ID,
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let compressed = Self::decode_response(&body)?;
        let target = write_sibling(ID, path, &compressed).await?;
        info!(?target, size = compressed.len(), "ConvertApiBackend::compress: document compressed");
        Ok(target)
    }
}
