//! Image registry client for the Glance v1 HTTP API using reqwest.

use std::fmt;
use std::fs::File;
use std::path::Path;

use reqwest::StatusCode;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::adapters::keystone_auth;
use crate::domain::{AppError, ImageRecord, NewImage, RegistryEndpoint, Settings};
use crate::ports::ImageRegistry;

const X_AUTH_TOKEN: &str = "X-Auth-Token";
const IMAGE_META_PREFIX: &str = "x-image-meta-";
const API_VERSION_SEGMENT: &str = "/v1";
const DEFAULT_STATUS_MESSAGE: &str = "Image registry request failed";

/// HTTP transport for the image registry.
///
/// Requests carry no timeout; image uploads can run for a long time.
#[derive(Clone)]
pub struct HttpGlanceClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl fmt::Debug for HttpGlanceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGlanceClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl HttpGlanceClient {
    /// Create a client for `endpoint`, optionally sending an auth token.
    pub fn new(endpoint: &Url, token: Option<String>) -> Result<Self, AppError> {
        Ok(Self { base_url: api_base(endpoint), token, client: build_http_client()? })
    }

    /// Create a client from settings, authenticating first when the strategy requires it.
    pub fn connect(settings: &Settings) -> Result<Self, AppError> {
        let client = build_http_client()?;
        let endpoint = settings.registry_endpoint()?;

        let session = if settings.auth_strategy.issues_tokens() {
            Some(keystone_auth::authenticate(&client, settings)?)
        } else {
            None
        };

        let endpoint = match endpoint {
            RegistryEndpoint::Fixed(url) => url,
            RegistryEndpoint::Discover => session
                .as_ref()
                .and_then(|s| s.image_endpoint.clone())
                .ok_or_else(|| {
                    AppError::config_error("Identity service catalog lists no image endpoint")
                })?,
        };

        Ok(Self { base_url: api_base(&endpoint), token: session.map(|s| s.token), client })
    }

    fn images_url(&self) -> String {
        format!("{}/images", self.base_url)
    }

    fn image_url(&self, id: &str) -> String {
        format!("{}/images/{}", self.base_url, id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(X_AUTH_TOKEN, token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| AppError::registry_error(format!("HTTP request failed: {}", e), None))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body_text = response.text().unwrap_or_default();
        let message = extract_error_message(&body_text).unwrap_or_else(|| {
            if status == StatusCode::NOT_FOUND {
                "Image not found".to_string()
            } else if !body_text.trim().is_empty() {
                body_text.trim().to_string()
            } else {
                DEFAULT_STATUS_MESSAGE.to_string()
            }
        });

        Err(AppError::registry_error(message, Some(status.as_u16())))
    }
}

fn build_http_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(None)
        .build()
        .map_err(|e| AppError::registry_error(format!("Failed to create HTTP client: {}", e), None))
}

/// Normalize an endpoint to `<scheme>://<host>[:port][/prefix]/v1`.
fn api_base(endpoint: &Url) -> String {
    let trimmed = endpoint.as_str().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(API_VERSION_SEGMENT).unwrap_or(trimmed);
    format!("{}{}", trimmed, API_VERSION_SEGMENT)
}

#[derive(Debug, Deserialize)]
struct ImageList {
    #[serde(default)]
    images: Vec<ImageRecord>,
}

#[derive(Debug, Deserialize)]
struct ImageEnvelope {
    image: ImageRecord,
}

fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(msg) = parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
    {
        return Some(msg.to_string());
    }

    parsed.get("message").and_then(|message| message.as_str()).map(ToOwned::to_owned)
}

fn record_from_headers(id: &str, headers: &HeaderMap) -> ImageRecord {
    let meta = |field: &str| {
        headers
            .get(format!("{}{}", IMAGE_META_PREFIX, field))
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
    };

    ImageRecord {
        id: meta("id").unwrap_or_else(|| id.to_string()),
        name: meta("name"),
        size: meta("size").and_then(|size| size.parse().ok()),
        owner: meta("owner"),
    }
}

fn meta_headers(request: RequestBuilder, image: &NewImage) -> RequestBuilder {
    let fields = [
        ("name", image.name.clone()),
        ("is_public", if image.is_public { "True" } else { "False" }.to_string()),
        ("disk_format", image.disk_format.clone()),
        ("container_format", image.container_format.clone()),
        ("min_disk", image.min_disk.to_string()),
        ("min_ram", image.min_ram.to_string()),
        ("owner", image.owner.clone()),
        ("size", image.size.to_string()),
    ];

    fields.into_iter().fold(request, |request, (field, value)| {
        request.header(format!("{}{}", IMAGE_META_PREFIX, field), value)
    })
}

impl ImageRegistry for HttpGlanceClient {
    fn location(&self) -> String {
        self.base_url.clone()
    }

    fn get_image(&self, id: &str) -> Result<ImageRecord, AppError> {
        let response = self.send(self.client.head(self.image_url(id)))?;
        Ok(record_from_headers(id, response.headers()))
    }

    fn list_images(&self, limit: usize, marker: Option<&str>) -> Result<Vec<ImageRecord>, AppError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(marker) = marker {
            query.push(("marker", marker.to_string()));
        }

        let url = format!("{}/detail", self.images_url());
        debug!("Listing images at {} (limit={}, marker={:?})", url, limit, marker);
        let response = self.send(self.client.get(url).query(&query))?;
        let status = response.status().as_u16();
        let list: ImageList = response.json().map_err(|e| {
            AppError::registry_error(format!("Failed to parse image list: {}", e), Some(status))
        })?;

        Ok(list.images)
    }

    fn add_image(&self, image: &NewImage, payload: &Path) -> Result<ImageRecord, AppError> {
        let file = File::open(payload)?;
        let request = self
            .client
            .post(self.images_url())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::sized(file, image.size));

        let response = self.send(meta_headers(request, image))?;
        let status = response.status().as_u16();
        let envelope: ImageEnvelope = response.json().map_err(|e| {
            AppError::registry_error(format!("Failed to parse upload response: {}", e), Some(status))
        })?;

        Ok(envelope.image)
    }

    fn delete_image(&self, id: &str) -> Result<(), AppError> {
        self.send(self.client.delete(self.image_url(id)))?;
        Ok(())
    }
}
