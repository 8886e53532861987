//! Environment-driven service configuration.
//!
//! A `.env` file in the working directory is loaded first, then the process
//! environment is deserialized with `envy`:
//!
//! | variable | meaning |
//! |---|---|
//! | `DATABASE_HOST`, `DATABASE_PORT`, `DATABASE_NAME`, `DATABASE_USER`, `DATABASE_PASSWORD` | PostgreSQL connection |
//! | `BACK_HOST`, `BACK_PORT` | listen address |
//! | `CORS_ORIGINS` | allowed origins, separated by `\|` |
//! | `RECOMMENDER_MODEL_PATH` | model artifact |
//! | `RECOMMENDER_DATA_DIR` | directory with `items.csv`, `users.csv`, `interactions.csv` (default `data`) |

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

use crate::error::{ConfigError, Result};

const DATABASE_PREFIX: &str = "DATABASE_";
const ORIGIN_SEPARATOR: char = '|';

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
    }
}

// Keeps the password out of logs
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Cross-origin policy: listed origins, credentials allowed, any method and
/// header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsSettings {
    pub origins: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsSettings {
    /// Parse a `|`-separated origin list
    pub fn from_origins(raw: &str) -> Result<Self> {
        let origins: Vec<String> = raw
            .split(ORIGIN_SEPARATOR)
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() {
            return Err(ConfigError::NoOrigins);
        }

        Ok(Self {
            origins,
            allow_credentials: true,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub model_path: PathBuf,
    pub data_dir: PathBuf,
}

/// Flat view of the non-prefixed variables
#[derive(Deserialize)]
struct AppVars {
    back_host: String,
    back_port: u16,
    cors_origins: String,
    recommender_model_path: PathBuf,
    #[serde(default = "default_data_dir")]
    recommender_data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseSettings,
    pub host: String,
    pub port: u16,
    pub cors: CorsSettings,
    pub recommender: RecommenderSettings,
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit `(NAME, value)` pairs
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        let database: DatabaseSettings = envy::prefixed(DATABASE_PREFIX).from_iter(vars.clone())?;
        let app: AppVars = envy::from_iter(vars)?;

        Ok(Self {
            database,
            host: app.back_host,
            port: app.back_port,
            cors: CorsSettings::from_origins(&app.cors_origins)?,
            recommender: RecommenderSettings {
                model_path: app.recommender_model_path,
                data_dir: app.recommender_data_dir,
            },
        })
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
