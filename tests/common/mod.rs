//! Common test utilities and helpers
//!
//! Shared connection factories for the integration tests.

use queryassert::config::ConnectionConfig;
use queryassert::config::settings::FOODMART_URL_ENV;
use queryassert::db::{Connection, SqliteConnection};
use queryassert::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Factory over fresh fixture connections that counts how often it is used
#[derive(Clone, Default)]
pub struct CountingFactory {
    calls: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl queryassert::ConnectionFactory for CountingFactory {
    fn create_connection(&self) -> Result<Box<dyn Connection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SqliteConnection::open_fixtures()?))
    }
}

/// FoodMart server from the environment, if one is configured
pub fn foodmart_config() -> Option<ConnectionConfig> {
    let url = std::env::var(FOODMART_URL_ENV).ok()?;
    match ConnectionConfig::from_url(&url) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Skipping test: {} is invalid - {}", FOODMART_URL_ENV, e);
            None
        }
    }
}
