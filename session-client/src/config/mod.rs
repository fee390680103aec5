use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub client: ClientSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    /// Credentials used by the binary when no stored session can be restored.
    #[serde(default)]
    pub login: Option<LoginSettings>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ClientSettings {
    /// Backend base URL, e.g. `https://api.example.com/api/v1`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_switch_organization_path")]
    pub switch_organization_path: String,
    #[serde(default = "default_switch_workspace_path")]
    pub switch_workspace_path: String,
    /// Capacity of the session event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl ClientSettings {
    /// Settings with default endpoint paths for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            refresh_path: default_refresh_path(),
            switch_organization_path: default_switch_organization_path(),
            switch_workspace_path: default_switch_workspace_path(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_switch_organization_path() -> String {
    "/auth/switch-organization".to_string()
}

fn default_switch_workspace_path() -> String {
    "/auth/switch-workspace".to_string()
}

fn default_event_capacity() -> usize {
    64
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Location of the credential file for the `file` backend.
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint. Spans are only exported when set.
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_service_name() -> String {
    "session-client".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoginSettings {
    pub email: String,
    pub password: Secret<String>,
    /// Organization to switch into after login.
    pub organization_id: Option<Uuid>,
    /// Workspace to switch into after the organization switch.
    pub workspace_id: Option<Uuid>,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Message(e.to_string()))?;

    // Support running from the workspace root or from the crate directory
    let configuration_directory = if base_path.ends_with("session-client") {
        base_path.join("config")
    } else {
        base_path.join("session-client").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
