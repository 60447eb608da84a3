//! Backend configurations
//!
//! [`Config`] is a closed set of named backends. [`ConfigConnectionFactory`]
//! turns a selector into a live connection.

use crate::config::load_settings;
use crate::db::clone::clone_foodmart;
use crate::db::connection::{Connection, ConnectionFactory};
use crate::db::postgres::{ExecutionMode, PostgresConnection};
use crate::db::sqlite::SqliteConnection;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named backend a query runs against
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Config {
    /// In-memory connection with the `hr` and `foodmart` fixture datasets
    Regular,
    /// External FoodMart database, values decoded through prepared statements
    Foodmart,
    /// External FoodMart database, queries sent as-is over the simple protocol
    FoodmartNative,
    /// Local in-memory clone of the external FoodMart tables
    FoodmartClone,
}

impl Config {
    /// Every configuration, in declaration order
    pub const ALL: [Config; 4] = [
        Config::Regular,
        Config::Foodmart,
        Config::FoodmartNative,
        Config::FoodmartClone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Config::Regular => "regular",
            Config::Foodmart => "foodmart",
            Config::FoodmartNative => "foodmart-native",
            Config::FoodmartClone => "foodmart-clone",
        }
    }

    /// Whether the configuration needs the external FoodMart server
    pub fn is_external(&self) -> bool {
        !matches!(self, Config::Regular)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Config::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown configuration '{}'", s)))
    }
}

/// Acquires connections for a fixed [`Config`]
#[derive(Debug, Clone, Copy)]
pub struct ConfigConnectionFactory {
    config: Config,
}

impl ConfigConnectionFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> Config {
        self.config
    }
}

impl ConnectionFactory for ConfigConnectionFactory {
    fn create_connection(&self) -> Result<Box<dyn Connection>> {
        tracing::debug!(config = %self.config, "acquiring connection");
        let connection: Box<dyn Connection> = match self.config {
            Config::Regular => Box::new(SqliteConnection::open_fixtures()?),
            Config::Foodmart => {
                let profile = load_settings()?.foodmart_connection()?;
                Box::new(PostgresConnection::connect(&profile, ExecutionMode::Translated)?)
            }
            Config::FoodmartNative => {
                let profile = load_settings()?.foodmart_connection()?;
                Box::new(PostgresConnection::connect(&profile, ExecutionMode::Native)?)
            }
            Config::FoodmartClone => {
                let settings = load_settings()?;
                let profile = settings.foodmart_connection()?;
                Box::new(clone_foodmart(&profile, &settings)?)
            }
        };
        Ok(connection)
    }
}
