use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::Store;

use crate::schemas::AppState;
use crate::session::SessionStore;

/// Runtime settings.
///
/// Sources, lowest precedence first: built-in defaults, an optional
/// `campusmart.toml` (or any format `config` understands) in the working
/// directory, then `CAMPUSMART__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub session: SessionSettings,
    pub uploads: UploadSettings,
    pub registration: RegistrationSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    pub cookie_name: String,
    /// Lifetime of a session in seconds, counted from login.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSettings {
    /// Transient storage for multipart file parts.
    pub dir: PathBuf,
    pub max_file_bytes: u64,
    pub max_images: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationSettings {
    /// Required suffix of every registered email address.
    pub email_domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CorsSettings {
    /// Origins allowed to send credentialed requests. Empty disables CORS headers.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://campusmart.db?mode=rwc".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            session: SessionSettings {
                cookie_name: "campusmart.sid".to_string(),
                ttl_secs: 600,
            },
            uploads: UploadSettings {
                dir: PathBuf::from("uploads"),
                max_file_bytes: 20 * 1024 * 1024,
                max_images: 4,
            },
            registration: RegistrationSettings {
                email_domain: "@mymail.sim.edu.sg".to_string(),
            },
            cors: CorsSettings::default(),
        }
    }
}

impl Settings {
    /// Loads `.env`, then layers file and environment sources over the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_sources(Some("campusmart"), Environment::with_prefix("CAMPUSMART"))
    }

    fn from_sources(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }
        builder
            .add_source(
                env.separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    /// Largest request body accepted: every image at full size plus room for form fields.
    pub fn body_limit(&self) -> usize {
        let images = self.uploads.max_file_bytes as usize * self.uploads.max_images.max(1);
        images + 1024 * 1024
    }
}

/// Connect to the database and assemble the shared handler state.
pub async fn initialize_app_state(settings: Settings) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", settings.database_url);
    let store = Store::connect(&settings.database_url).await?;

    tokio::fs::create_dir_all(&settings.uploads.dir).await?;

    Ok(app_state(store, settings))
}

/// Shared state over an already connected store.
pub fn app_state(store: Store, settings: Settings) -> AppState {
    let sessions = SessionStore::new(settings.session.cookie_name.clone(), settings.session_ttl());
    AppState {
        store,
        sessions,
        settings: Arc::new(settings),
    }
}
