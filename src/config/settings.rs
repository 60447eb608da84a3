//! Harness settings
//!
//! Manages settings stored in ~/.queryassert/config.toml and locates the
//! external FoodMart backend.

use crate::config::ConnectionConfig;
use crate::config::connections::{config_dir, find_connection};
use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};

/// Environment variable holding a `postgres://` URL for the FoodMart backend
pub const FOODMART_URL_ENV: &str = "QUERYASSERT_FOODMART_URL";

/// Harness settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Connection profile used for the FoodMart configurations
    #[serde(default = "default_foodmart_profile")]
    pub foodmart_profile: String,

    /// Schema holding the FoodMart tables, remotely and in clones
    #[serde(default = "default_foodmart_schema")]
    pub foodmart_schema: String,

    /// Tables copied into a local FoodMart clone
    #[serde(default = "default_clone_tables")]
    pub clone_tables: Vec<String>,
}

fn default_foodmart_profile() -> String {
    "foodmart".to_string()
}

fn default_foodmart_schema() -> String {
    "foodmart".to_string()
}

fn default_clone_tables() -> Vec<String> {
    ["customer", "product", "sales_fact_1997", "store", "time_by_day"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            foodmart_profile: default_foodmart_profile(),
            foodmart_schema: default_foodmart_schema(),
            clone_tables: default_clone_tables(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text; missing keys take their defaults
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the FoodMart backend.
    ///
    /// `QUERYASSERT_FOODMART_URL` wins over the named connection profile.
    pub fn foodmart_connection(&self) -> ConfigResult<ConnectionConfig> {
        match std::env::var(FOODMART_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => ConnectionConfig::from_url(&url),
            _ => find_connection(&self.foodmart_profile),
        }
    }
}

/// Load settings from config file
pub fn load_settings() -> ConfigResult<Settings> {
    let path = config_dir()?.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| {
        crate::error::ConfigError::NotFound(format!("Failed to read settings file: {}", e))
    })?;
    Settings::from_toml(&content)
}
