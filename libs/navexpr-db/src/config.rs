//! Typed configuration extracted from `figment`.

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::translate::TranslateOptions;
use crate::{ConnectOpts, DbError, Result};

/// Environment prefix for overrides, e.g. `CF_DATABASE__DSN`.
pub const ENV_PREFIX: &str = "CF_";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    pub dsn: String,
    pub max_conns: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite::memory:".to_owned(),
            max_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl DbConfig {
    /// Extract the section at `key`. Missing keys fall back to defaults.
    ///
    /// # Errors
    /// Returns `DbError::Config` when the section is malformed.
    pub fn from_figment(figment: &Figment, key: &str) -> Result<Self> {
        let cfg: Self = figment.focus(key).extract().map_err(Box::new)?;
        if cfg.dsn.trim().is_empty() {
            return Err(DbError::InvalidConfig(format!("{key}.dsn must not be empty")));
        }
        Ok(cfg)
    }

    #[must_use]
    pub fn connect_opts(&self) -> ConnectOpts {
        let defaults = ConnectOpts::default();
        ConnectOpts {
            max_conns: self.max_conns.or(defaults.max_conns),
            acquire_timeout: self.acquire_timeout,
        }
    }
}

/// Query translation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Collapse `IIF(x == null, null, x.m)` guards before translating to SQL.
    pub fold_null_guards: bool,
}

impl QueryConfig {
    /// # Errors
    /// Returns `DbError::Config` when the section is malformed.
    pub fn from_figment(figment: &Figment, key: &str) -> Result<Self> {
        Ok(figment.focus(key).extract().map_err(Box::new)?)
    }

    #[must_use]
    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            fold_null_guards: self.fold_null_guards,
        }
    }
}

/// Defaults merged with `CF_`-prefixed environment overrides.
///
/// Nested keys use a double underscore: `CF_DATABASE__DSN=sqlite://./x.db`.
#[must_use]
pub fn layered_figment<T: Serialize>(defaults: &T) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(defaults))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}
