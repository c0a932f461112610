//! Token authentication against an identity service (Keystone v2).

use std::fmt;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{AppError, Settings};

const IMAGE_SERVICE_TYPE: &str = "image";

/// Token and catalog entry returned by the identity service.
#[derive(Clone)]
pub struct KeystoneSession {
    pub token: String,
    /// Public endpoint of the image service, when the catalog lists one.
    pub image_endpoint: Option<Url>,
}

impl fmt::Debug for KeystoneSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoneSession")
            .field("token", &"[REDACTED]")
            .field("image_endpoint", &self.image_endpoint)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    password_credentials: PasswordCredentials<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Access {
    token: Token,
    #[serde(default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Endpoint {
    #[serde(rename = "publicURL")]
    public_url: Option<String>,
}

/// Exchange the configured credentials for a token.
pub fn authenticate(client: &Client, settings: &Settings) -> Result<KeystoneSession, AppError> {
    let auth_url = settings
        .auth_url
        .as_deref()
        .ok_or_else(|| AppError::config_error("OS_AUTH_URL is required for keystone authentication"))?;
    let username = settings
        .username
        .as_deref()
        .ok_or_else(|| AppError::config_error("OS_USERNAME is required for keystone authentication"))?;
    let password = settings.password.as_deref().unwrap_or_default();

    let request = TokenRequest {
        auth: AuthBody {
            password_credentials: PasswordCredentials { username, password },
            tenant_name: settings.tenant.as_deref(),
        },
    };

    let tokens_url = format!("{}/tokens", auth_url.trim_end_matches('/'));
    let response = client
        .post(&tokens_url)
        .json(&request)
        .send()
        .map_err(|e| AppError::RegistryUnavailable(format!("{} ({})", auth_url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::RegistryUnavailable(format!(
            "{} (authentication rejected with status {})",
            auth_url,
            status.as_u16()
        )));
    }

    let body: TokenResponse = response.json().map_err(|e| {
        AppError::registry_error(format!("Failed to parse token response: {}", e), Some(status.as_u16()))
    })?;

    let image_endpoint = body
        .access
        .service_catalog
        .iter()
        .filter(|entry| entry.service_type == IMAGE_SERVICE_TYPE)
        .flat_map(|entry| entry.endpoints.iter())
        .find_map(|endpoint| endpoint.public_url.as_deref())
        .map(Url::parse)
        .transpose()
        .map_err(|e| AppError::config_error(format!("Invalid image endpoint in catalog: {}", e)))?;

    Ok(KeystoneSession { token: body.access.token.id, image_endpoint })
}
