// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Sources, lowest precedence first: built-in defaults, `chirpy.toml` (or an
//! explicit file), `CHIRPY_*` environment variables, and finally the bare
//! `JWT_SECRET` / `POLKA_KEY` variables.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "chirpy.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Database file
    pub db_path: PathBuf,
    /// Directory served under `/app`
    pub file_root: PathBuf,
    /// HMAC secret for access and refresh tokens
    pub jwt_secret: String,
    /// Pre-shared key for the payment provider webhook
    pub polka_key: String,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Delete the database file on startup
    pub reset_db: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: PathBuf::from("database.json"),
            file_root: PathBuf::from("."),
            jwt_secret: String::new(),
            polka_key: String::new(),
            log_level: "info".to_string(),
            reset_db: false,
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("file_root", &self.file_root)
            .field("jwt_secret", &"<redacted>")
            .field("polka_key", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("reset_db", &self.reset_db)
            .finish()
    }
}

impl Settings {
    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("CHIRPY_"))
            .merge(Env::raw().only(&["jwt_secret", "polka_key"]))
    }

    /// Load settings from `chirpy.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from an explicit file and the environment.
    /// A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings can actually run a server
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("jwt_secret must be set (CHIRPY_JWT_SECRET or JWT_SECRET)");
        }
        if self.polka_key.trim().is_empty() {
            bail!("polka_key must be set (CHIRPY_POLKA_KEY or POLKA_KEY)");
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log level {:?}", self.log_level);
        }
        Ok(())
    }
}
