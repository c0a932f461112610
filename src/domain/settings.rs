//! Immutable run configuration assembled from CLI flags and the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::domain::AppError;

pub const ENV_AUTH_STRATEGY: &str = "OS_AUTH_STRATEGY";
pub const ENV_AUTH_URL: &str = "OS_AUTH_URL";
pub const ENV_TENANT: &str = "OS_TENANT_NAME";
pub const ENV_USERNAME: &str = "OS_USERNAME";
pub const ENV_PASSWORD: &str = "OS_PASSWORD";
pub const ENV_REGISTRY_HOST: &str = "GLANCE_HOST";
pub const ENV_REGISTRY_PORT: &str = "GLANCE_PORT";
pub const ENV_DESCRIPTOR_DIR: &str = "PREBAKE_DESCRIPTOR_DIR";
pub const ENV_IMAGE_DIR: &str = "PREBAKE_IMAGE_DIR";
pub const ENV_BUILD_COMMAND: &str = "PREBAKE_BUILD_COMMAND";
pub const ENV_CONVERT_COMMAND: &str = "PREBAKE_CONVERT_COMMAND";

pub const DEFAULT_REGISTRY_HOST: &str = "0.0.0.0";
pub const DEFAULT_REGISTRY_PORT: u16 = 9292;
pub const DEFAULT_DESCRIPTOR_DIR: &str = "/usr/share/prebake/descriptors";
pub const DEFAULT_IMAGE_DIR: &str = "/var/lib/libvirt/images";
pub const DEFAULT_BUILD_COMMAND: &str = "oz-install";
pub const DEFAULT_CONVERT_COMMAND: &str = "qemu-img";

/// How the registry client authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStrategy {
    /// No credentials are sent.
    #[default]
    Noauth,
    /// Token issued by the identity service.
    Keystone,
}

impl AuthStrategy {
    /// Whether this strategy obtains a token that carries a service catalog.
    pub fn issues_tokens(&self) -> bool {
        matches!(self, AuthStrategy::Keystone)
    }
}

impl FromStr for AuthStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "noauth" => Ok(AuthStrategy::Noauth),
            "keystone" => Ok(AuthStrategy::Keystone),
            other => Err(AppError::config_error(format!(
                "Unknown auth strategy '{}': must be one of noauth, keystone",
                other
            ))),
        }
    }
}

/// Where the registry client should send requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEndpoint {
    /// Literal host and port.
    Fixed(Url),
    /// Look the endpoint up in the identity service catalog.
    Discover,
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub registry_host: Option<String>,
    pub registry_port: Option<u16>,
    pub parameters: Option<String>,
    pub descriptor_dir: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub debug: bool,
}

/// Configuration threaded through every pipeline stage.
#[derive(Clone)]
pub struct Settings {
    pub auth_strategy: AuthStrategy,
    pub auth_url: Option<String>,
    pub tenant: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Explicitly configured registry host, if any.
    pub registry_host: Option<String>,
    /// Explicitly configured registry port, if any.
    pub registry_port: Option<u16>,
    pub debug: bool,
    pub parameters: String,
    pub descriptor_dir: PathBuf,
    pub image_dir: PathBuf,
    pub build_command: String,
    pub convert_command: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("auth_strategy", &self.auth_strategy)
            .field("auth_url", &self.auth_url)
            .field("tenant", &self.tenant)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("registry_host", &self.registry_host)
            .field("registry_port", &self.registry_port)
            .field("debug", &self.debug)
            .field("parameters", &self.parameters)
            .field("descriptor_dir", &self.descriptor_dir)
            .field("image_dir", &self.image_dir)
            .field("build_command", &self.build_command)
            .field("convert_command", &self.convert_command)
            .finish()
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env(overrides: SettingsOverrides) -> Result<Self, AppError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(overrides: SettingsOverrides, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let auth_strategy = match var(ENV_AUTH_STRATEGY) {
            Some(value) => value.parse()?,
            None => AuthStrategy::default(),
        };

        let env_port = match var(ENV_REGISTRY_PORT) {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                AppError::config_error(format!("{} must be a port number, got '{}'", ENV_REGISTRY_PORT, raw))
            })?),
            None => None,
        };

        Ok(Self {
            auth_strategy,
            auth_url: var(ENV_AUTH_URL),
            tenant: var(ENV_TENANT),
            username: var(ENV_USERNAME),
            password: var(ENV_PASSWORD),
            registry_host: overrides.registry_host.or_else(|| var(ENV_REGISTRY_HOST)),
            registry_port: overrides.registry_port.or(env_port),
            debug: overrides.debug,
            parameters: overrides.parameters.unwrap_or_default(),
            descriptor_dir: overrides
                .descriptor_dir
                .or_else(|| var(ENV_DESCRIPTOR_DIR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DESCRIPTOR_DIR)),
            image_dir: overrides
                .image_dir
                .or_else(|| var(ENV_IMAGE_DIR).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_DIR)),
            build_command: var(ENV_BUILD_COMMAND).unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string()),
            convert_command: var(ENV_CONVERT_COMMAND)
                .unwrap_or_else(|| DEFAULT_CONVERT_COMMAND.to_string()),
        })
    }

    /// Resolve the registry endpoint.
    ///
    /// A token-issuing strategy with neither host nor port configured discovers
    /// the endpoint from the identity service; everything else uses host and port,
    /// filling the missing half with its default.
    pub fn registry_endpoint(&self) -> Result<RegistryEndpoint, AppError> {
        if self.auth_strategy.issues_tokens()
            && self.registry_host.is_none()
            && self.registry_port.is_none()
        {
            return Ok(RegistryEndpoint::Discover);
        }

        let host = self.registry_host.as_deref().unwrap_or(DEFAULT_REGISTRY_HOST);
        let port = self.registry_port.unwrap_or(DEFAULT_REGISTRY_PORT);
        let url = Url::parse(&format!("http://{}:{}", host, port)).map_err(|e| {
            AppError::config_error(format!("Invalid registry address '{}:{}': {}", host, port, e))
        })?;
        Ok(RegistryEndpoint::Fixed(url))
    }

    /// Owner recorded on uploaded images: the authenticated username.
    pub fn owner(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}
