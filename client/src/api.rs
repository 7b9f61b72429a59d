// Module declarations for the service API wrappers
pub mod auth;
pub mod detection;
pub mod endpoints;
pub mod profile;
pub mod protection;

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use common::ServiceErrorBody;
use reqwest::multipart::Part;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::media::MediaSelection;

/// Thin HTTP client for the detection and protection service.
///
/// One `reqwest::Client` with a fixed timeout is shared by every call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_scheme: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, auth_scheme: &str) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_scheme: auth_scheme.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> ClientResult<Self> {
        Self::new(
            &config.api_url,
            Duration::from_secs(config.timeout_secs),
            &config.auth_scheme,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.authorize(self.http.get(self.url(path)), token)
    }

    fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.authorize(self.http.post(self.url(path)), token)
    }

    fn authorize(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header(
            reqwest::header::AUTHORIZATION,
            format!("{} {}", self.auth_scheme, token),
        )
    }

    /// Send a request and decode a 2xx JSON body.
    ///
    /// A non-2xx status becomes `ClientError::Server` carrying the service's
    /// own message when the error body has one.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceErrorBody>(&body)
                .ok()
                .and_then(|err| err.message())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                });
            tracing::warn!("{} returned {}: {}", url, status, message);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Invalid response from {}: {}", url, e);
            ClientError::Parse(format!("{}: {}", url, e))
        })
    }
}

/// Multipart file part for a selected media file
async fn media_part(media: &MediaSelection, stem: &str) -> ClientResult<Part> {
    let bytes = media.read_bytes().await?;
    Part::bytes(bytes)
        .file_name(media.upload_file_name(stem))
        .mime_str(media.mime_type())
        .map_err(|e| ClientError::InvalidInput(format!("Invalid MIME type: {}", e)))
}
