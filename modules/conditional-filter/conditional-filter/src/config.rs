use figment::Figment;
use navexpr_db::config::layered_figment;
use navexpr_db::{DbConfig, QueryConfig};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Module configuration.
///
/// ```yaml
/// database:
///   dsn: "sqlite::memory:"
///   acquire_timeout: 30s
/// query:
///   fold_null_guards: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConditionalFilterConfig {
    pub database: DbConfig,
    pub query: QueryConfig,
}

impl ConditionalFilterConfig {
    /// Defaults overridden by `CF_`-prefixed environment variables.
    ///
    /// # Errors
    /// Returns `DomainError::Db` when a section is malformed.
    pub fn load() -> Result<Self, DomainError> {
        Self::from_figment(&layered_figment(&Self::default()))
    }

    /// # Errors
    /// Returns `DomainError::Db` when a section is malformed.
    pub fn from_figment(figment: &Figment) -> Result<Self, DomainError> {
        Ok(Self {
            database: DbConfig::from_figment(figment, "database")?,
            query: QueryConfig::from_figment(figment, "query")?,
        })
    }
}
