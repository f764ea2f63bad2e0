//! Handles settings for the application.
//!
//! Values are read from a TOML file (`settings.toml` unless `--config` says
//! otherwise, optional) and from `FINTRACK__*` environment variables, e.g.
//! `FINTRACK__AUTH__SECRET`.
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Parser)]
#[command(name = "fintrack", about = "Personal finance tracking server")]
struct Args {
    /// Config file path (TOML), extension optional.
    #[arg(long, env = "FINTRACK_CONFIG")]
    config: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// `memory` for a throwaway in-memory database, anything else is the path
/// of a SQLite file (created if missing).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl From<String> for Database {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("memory") {
            Self::Memory
        } else {
            Self::Sqlite(value)
        }
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    /// HS256 signing secret.
    pub secret: String,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
    pub bcrypt_cost: Option<u32>,
}

fn default_access_ttl_minutes() -> i64 {
    30
}

fn default_refresh_ttl_days() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    pub auth: Auth,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();
        let path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FINTRACK").separator("__"))
            .build()?
            .try_deserialize()
    }
}
