//! HTTP gateway resolution of content references.
//!
//! Resolves `ipfs://<digest>` to `https://<gateway>/ipfs/<digest>`. The
//! gateway is read-only; writes always go through an [`ArchiveSink`].
//!
//! [`ArchiveSink`]: crate::sink::ArchiveSink

use crate::error::StorageError;
use crate::sink::{ContentRef, ContentResolver};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default request timeout for gateway fetches.
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

/// A content resolver backed by a public or dedicated HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    /// Creates a client for `gateway`, either a bare host
    /// (`example.mypinata.cloud`) or a full base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(gateway: &str, timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Gateway {
                url: gateway.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url(gateway),
        })
    }

    /// Returns the URL content for `content_ref` is fetched from.
    #[must_use]
    pub fn url_for(&self, content_ref: &ContentRef) -> String {
        format!("{}/ipfs/{}", self.base_url, content_ref.digest())
    }
}

fn base_url(gateway: &str) -> String {
    let trimmed = gateway.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[async_trait]
impl ContentResolver for GatewayClient {
    #[instrument(skip(self), fields(gateway = %self.base_url))]
    async fn resolve(&self, content_ref: &ContentRef) -> Result<String, StorageError> {
        let url = self.url_for(content_ref);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, url = %url, "gateway request failed");
            StorageError::Gateway {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::ContentNotFound {
                content_ref: content_ref.clone(),
            });
        }
        if !status.is_success() {
            return Err(StorageError::Gateway {
                url,
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(|e| StorageError::Gateway {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        debug!(bytes = body.len(), "gateway content fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https() {
        let client = GatewayClient::new("demo.mypinata.cloud", Duration::from_secs(1)).unwrap();
        let r = ContentRef::for_content("Hello World");
        assert_eq!(
            client.url_for(&r),
            format!("https://demo.mypinata.cloud/ipfs/{}", r.digest())
        );
    }

    #[test]
    fn explicit_scheme_is_kept() {
        assert_eq!(base_url("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(base_url(" gw.example "), "https://gw.example");
    }

    #[tokio::test]
    async fn unreachable_gateway_is_gateway_error() {
        let client = GatewayClient::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
        let err = client
            .resolve(&ContentRef::for_content("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Gateway { .. }), "{err}");
    }
}
