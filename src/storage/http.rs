//! HTTP blob store: HEAD/GET against the public host, PUT against the upload endpoint.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::StorageError;
use crate::storage::{validate_key, ObjectStore};

const STORE_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const STORE_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct PutResponse {
    url: Option<String>,
}

pub struct HttpObjectStore {
    client: Client,
    public_base_url: String,
    upload_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        public_base_url: impl Into<String>,
        upload_url: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .connect_timeout(STORE_HTTP_CONNECT_TIMEOUT)
            .timeout(STORE_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| io_error(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

fn io_error(message: String) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, message))
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn head_exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let response = self
            .client
            .head(self.url_for(key))
            .send()
            .await
            .map_err(|e| io_error(format!("HEAD {key} failed: {e}")))?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(false),
            s => Err(io_error(format!("HEAD {key} returned {s}"))),
        }
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let mut request = self
            .client
            .put(format!("{}/{}", self.upload_url, key))
            .header("Content-Type", content_type)
            .body(bytes.to_vec());
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| io_error(format!("PUT {key} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(io_error(format!("PUT {key} returned {status}: {body}")));
        }

        let url = response
            .json::<PutResponse>()
            .await
            .ok()
            .and_then(|r| r.url)
            .unwrap_or_else(|| self.url_for(key));
        debug!(key, url = %url, "Uploaded object");
        Ok(url)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let response = self
            .client
            .get(self.url_for(key))
            .send()
            .await
            .map_err(|e| io_error(format!("GET {key} failed: {e}")))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| io_error(format!("GET {key} body failed: {e}")))?;
                Ok(Some(bytes.to_vec()))
            }
            s => Err(io_error(format!("GET {key} returned {s}"))),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
