//! src/configuration.rs
use config::{Config, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub email: EmailSettings,
    pub alert: AlertSettings,
}

impl Settings {
    pub fn set_email_url(&mut self, email_url: String) {
        if let Some(brevo) = &mut self.email.brevo {
            brevo.api_url = email_url;
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
    pub timeout_milliseconds: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub port: u16,
    pub host: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    File,
    Memory,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub file_path: String,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailBackend {
    Brevo,
    Smtp,
    Noop,
}

#[derive(Deserialize, Clone, Debug)]
pub struct EmailSettings {
    pub backend: EmailBackend,
    pub sender_name: String,
    pub sender_email: String,
    pub timeout_milliseconds: u64,
    pub brevo: Option<BrevoSettings>,
    pub smtp: Option<SmtpSettings>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BrevoSettings {
    pub api_url: String,
    pub api_key: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

fn default_starttls() -> bool {
    true
}

#[derive(Deserialize, Clone, Debug)]
pub struct AlertSettings {
    pub website_url: String,
    pub max_concurrent_sends: usize,
    pub deadline_milliseconds: u64,
}

/// Secrets that are kept out of the YAML files.
#[derive(Deserialize, Debug, Default)]
struct EmailSecrets {
    api_key: Option<Secret<String>>,
    smtp_password: Option<Secret<String>>,
}

impl DatabaseSettings {
    /// Omitting the database name connects to the Postgres instance, not a specific logical database.
    /// This is useful for operations that create or drop databases.
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            // Try an encrypted connection, fallback to unencrypted if it fails
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl EmailSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl AlertSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_milliseconds)
    }
}

#[derive(Debug, PartialEq)]
pub enum Environment {
    Local,
    Production,
}
impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_ref() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            _ => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                s
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment.
    // Default to `local` if not specified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base")).required(true))
        .add_source(File::from(configuration_directory.join(environment.as_str())).required(true))
        .add_source(environment_overrides())
        .build()?;

    let mut settings: Settings = settings.try_deserialize()?;

    if environment == Environment::Local {
        if let Err(e) = load_local_secrets(&configuration_directory.join("email")) {
            tracing::warn!(error = %e, "Ignoring malformed `configuration/email` file");
        }
    }

    let secrets = envy::prefixed("EMAIL_CLIENT_")
        .from_env::<EmailSecrets>()
        .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    settings.email.apply(secrets);

    Ok(settings)
}

/// `APP_` variables override any option, e.g. `APP_APPLICATION__PORT=5001`
/// sets `Settings.application.port`. Allowed origins are comma separated.
fn environment_overrides() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("application.allowed_origins")
}

/// Local mail credentials live outside version control, so the file is optional.
fn load_local_secrets(path: &Path) -> Result<(), dotenvy::Error> {
    match dotenvy::from_path(path) {
        Err(e) if e.not_found() => Ok(()),
        result => result,
    }
}

impl EmailSettings {
    fn apply(&mut self, secrets: EmailSecrets) {
        if let (Some(brevo), Some(api_key)) = (&mut self.brevo, secrets.api_key) {
            brevo.api_key = api_key;
        }
        if let (Some(smtp), Some(password)) = (&mut self.smtp, secrets.smtp_password) {
            smtp.password = password;
        }
    }
}
