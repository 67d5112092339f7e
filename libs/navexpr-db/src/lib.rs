#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Database side of navigation expressions.
//!
//! This crate provides:
//! - A `SeaORM` connection handle over `SQLite` with in-memory support (`DbHandle`)
//! - `figment`-backed configuration (`config`)
//! - A per-module migration runner (`migration_runner`)
//! - Translation of predicate lambdas into joins plus a `WHERE` condition (`translate`)
//! - A query builder that filters in SQL and eager-loads navigations separately (`query`)
//!
//! # Example
//! ```rust,no_run
//! use navexpr_db::{DbConfig, DbHandle};
//!
//! # async fn run() -> navexpr_db::Result<()> {
//! let db = DbHandle::from_config(&DbConfig::default()).await?;
//! assert!(db.is_memory());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod migration_runner;
pub mod query;
pub mod translate;

pub use config::{DbConfig, QueryConfig};
pub use migration_runner::{MigrationError, MigrationResult, run_migrations_for_module};
pub use query::{Materialize, NavEntity, NavQuery, include_path};
pub use translate::{JoinSpec, TranslateError, TranslateOptions, TranslatedFilter, translate_predicate};

use std::time::Duration;

use sea_orm::sqlx::sqlite::SqlitePoolOptions;
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use thiserror::Error;
use tracing::{debug, info};

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the handle, queries and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    Sqlx(#[from] sea_orm::sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Expr(#[from] navexpr::ExprError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("Include {path} is not supported for {root}")]
    UnsupportedInclude { root: &'static str, path: String },

    #[error("Query over {expected} cannot use an expression rooted at {got}")]
    RootMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

/// Pool knobs applied on connect.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool. Ignored for in-memory `SQLite`.
    pub max_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Main handle.
#[derive(Debug, Clone)]
pub struct DbHandle {
    dsn: String,
    memory: bool,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Validate that `dsn` names a `SQLite` database and return it trimmed.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` for any other scheme.
    pub fn detect(dsn: &str) -> Result<&str> {
        let s = dsn.trim();
        if s.starts_with("sqlite:") {
            Ok(s)
        } else {
            Err(DbError::UnknownDsn(dsn.to_owned()))
        }
    }

    /// Connect and build handle.
    ///
    /// An in-memory `SQLite` database lives only as long as its connection, so
    /// memory DSNs get a single pooled connection that never idles out.
    ///
    /// # Errors
    /// Returns an error if the DSN is not a `SQLite` one or the connection fails.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let dsn = Self::detect(dsn)?;
        let memory = is_memory_dsn(dsn);
        let mut o = SqlitePoolOptions::new();
        if memory {
            o = o
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else if let Some(n) = opts.max_conns {
            o = o.max_connections(n);
        }
        if let Some(t) = opts.acquire_timeout {
            o = o.acquire_timeout(t);
        }

        let pool = o.connect(dsn).await?;
        let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        info!(dsn, memory, "connected to sqlite");

        Ok(Self {
            dsn: dsn.to_owned(),
            memory,
            sea,
        })
    }

    /// Connect using a loaded [`DbConfig`].
    ///
    /// # Errors
    /// Same as [`DbHandle::connect`].
    pub async fn from_config(cfg: &DbConfig) -> Result<Self> {
        debug!(dsn = %cfg.dsn, "connecting from config");
        Self::connect(&cfg.dsn, cfg.connect_opts()).await
    }

    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.memory
    }

    /// `SeaORM` connection.
    #[must_use]
    pub fn sea(&self) -> &DatabaseConnection {
        &self.sea
    }
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}
