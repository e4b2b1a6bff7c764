use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::domain::filter::DEFAULT_SEARCH_LIMIT;
use crate::repository::database::init_database;
use crate::repository::{DynCatalogGateway, RestGateway, SqliteGateway};
use crate::services::ControllerOptions;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hosted PostgREST-compatible database
    Rest,
    /// Local SQLite file
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub backend: Backend,

    /// Project URL of the hosted database, e.g. `https://<ref>.supabase.co`
    pub base_url: String,

    /// Public (anon) API key sent as both `apikey` and bearer token
    pub api_key: String,

    pub table: String,

    pub sqlite_path: String,

    /// Maximum rows returned by one search
    pub default_limit: usize,

    pub request_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            base_url: String::new(),
            api_key: String::new(),
            table: "products".to_string(),
            sqlite_path: "catalog.db".to_string(),
            default_limit: DEFAULT_SEARCH_LIMIT,
            request_timeout_secs: 30,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from the user config directory, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let default_config = Self::default();
            default_config.save_to(path)?;
            Ok(default_config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("pos-catalog").join("config.toml"))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CATALOG_BASE_URL") {
            self.base_url = url;
        }
        if let Some(key) = lookup("CATALOG_API_KEY") {
            self.api_key = key;
        }
        if let Some(path) = lookup("CATALOG_SQLITE_PATH") {
            self.sqlite_path = path;
        }
        match lookup("CATALOG_BACKEND").as_deref() {
            Some("rest") => self.backend = Backend::Rest,
            Some("sqlite") => self.backend = Backend::Sqlite,
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 {
            bail!("default_limit must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.backend == Backend::Rest {
            if self.base_url.trim().is_empty() {
                bail!(
                    "No base_url configured for the rest backend.\n\
                    Set it in {} or via CATALOG_BASE_URL",
                    Self::config_path().map(|p| p.display().to_string()).unwrap_or_default()
                );
            }
            if self.api_key.trim().is_empty() {
                bail!("No api_key configured for the rest backend (CATALOG_API_KEY)");
            }
        }
        if self.backend == Backend::Sqlite && self.sqlite_path.trim().is_empty() {
            bail!("sqlite_path cannot be empty");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            search_limit: self.default_limit,
            request_timeout: self.request_timeout(),
        }
    }

    pub async fn build_gateway(&self) -> Result<DynCatalogGateway> {
        self.validate()?;
        match self.backend {
            Backend::Rest => {
                info!(base_url = %self.base_url, table = %self.table, "Using remote catalog");
                let gateway = RestGateway::new(
                    &self.base_url,
                    &self.api_key,
                    &self.table,
                    self.request_timeout(),
                )?;
                Ok(Arc::new(gateway))
            }
            Backend::Sqlite => {
                info!(path = %self.sqlite_path, "Using local catalog");
                let pool = init_database(&self.sqlite_path).await?;
                Ok(Arc::new(SqliteGateway::new(Arc::new(pool))))
            }
        }
    }
}
