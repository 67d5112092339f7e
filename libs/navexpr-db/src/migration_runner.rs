//! Per-module migration runner.
//!
//! Each module records applied migration names in its own history table,
//! `navexpr_migrations__<module>__<hash8>`. The hash is `xxh3_64` of the raw
//! module name, so names that sanitize to the same identifier stay apart.
//! Pending migrations run in name order, each in one transaction together with
//! its history row.

use std::collections::HashSet;

use sea_orm::sea_query::{Alias, ColumnDef, Expr, Query, Table};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult, TransactionTrait};
use sea_orm_migration::{MigrationTrait, SchemaManager};
use thiserror::Error;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::DbHandle;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to create migration table for module '{module}': {source}")]
    CreateTable { module: String, source: DbErr },

    #[error("failed to query migration history for module '{module}': {source}")]
    QueryHistory { module: String, source: DbErr },

    #[error("migration '{migration}' failed for module '{module}': {source}")]
    MigrationFailed {
        module: String,
        migration: String,
        source: DbErr,
    },

    #[error("duplicate migration name '{name}' for module '{module}'")]
    DuplicateMigrationName { module: String, name: String },
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationResult {
    pub applied: usize,
    pub skipped: usize,
    pub applied_names: Vec<String>,
}

#[derive(Debug, FromQueryResult)]
struct AppliedRow {
    version: String,
}

/// History table of one module.
struct History<'a> {
    module: &'a str,
    table: Alias,
}

impl<'a> History<'a> {
    const VERSION: &'static str = "version";
    const APPLIED_AT: &'static str = "applied_at";

    fn new(module: &'a str) -> Self {
        Self {
            module,
            table: Alias::new(history_table_name(module)),
        }
    }

    async fn ensure(&self, conn: &impl ConnectionTrait) -> Result<(), MigrationError> {
        let stmt = Table::create()
            .table(self.table.clone())
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new(Self::VERSION))
                    .text()
                    .not_null()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(Alias::new(Self::APPLIED_AT))
                    .timestamp()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .to_owned();
        conn.execute(conn.get_database_backend().build(&stmt))
            .await
            .map_err(|source| MigrationError::CreateTable {
                module: self.module.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn applied(&self, conn: &impl ConnectionTrait) -> Result<HashSet<String>, MigrationError> {
        let stmt = Query::select()
            .column(Alias::new(Self::VERSION))
            .from(self.table.clone())
            .to_owned();
        let rows = AppliedRow::find_by_statement(conn.get_database_backend().build(&stmt))
            .all(conn)
            .await
            .map_err(|source| MigrationError::QueryHistory {
                module: self.module.to_owned(),
                source,
            })?;
        Ok(rows.into_iter().map(|r| r.version).collect())
    }

    async fn record(&self, conn: &impl ConnectionTrait, migration: &str) -> Result<(), DbErr> {
        let stmt = Query::insert()
            .into_table(self.table.clone())
            .columns([Alias::new(Self::VERSION)])
            .values([migration.into()])
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .to_owned();
        conn.execute(conn.get_database_backend().build(&stmt)).await?;
        Ok(())
    }
}

/// History table name for `module_name`.
pub(crate) fn history_table_name(module_name: &str) -> String {
    let mut ident: String = module_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if ident.is_empty() {
        ident.push('_');
    }
    let hash = xxh3_64(module_name.as_bytes()) >> 32;
    format!("navexpr_migrations__{ident}__{hash:08x}")
}

fn check_unique(
    module_name: &str,
    migrations: &[Box<dyn MigrationTrait>],
) -> Result<(), MigrationError> {
    let mut seen = HashSet::with_capacity(migrations.len());
    match migrations.iter().map(|m| m.name()).find(|n| !seen.insert(*n)) {
        Some(name) => Err(MigrationError::DuplicateMigrationName {
            module: module_name.to_owned(),
            name: name.to_owned(),
        }),
        None => Ok(()),
    }
}

/// Apply pending `migrations` for `module_name`.
///
/// # Errors
/// Returns `MigrationError` if names are duplicated, the history table cannot
/// be created or read, or any migration fails. A failed migration is rolled
/// back together with its history row.
pub async fn run_migrations_for_module(
    db: &DbHandle,
    module_name: &str,
    mut migrations: Vec<Box<dyn MigrationTrait>>,
) -> Result<MigrationResult, MigrationError> {
    let mut result = MigrationResult::default();
    if migrations.is_empty() {
        debug!(module = module_name, "no migrations to run");
        return Ok(result);
    }
    check_unique(module_name, &migrations)?;

    let conn = db.sea();
    let history = History::new(module_name);
    history.ensure(conn).await?;
    let applied = history.applied(conn).await?;

    migrations.sort_by(|a, b| a.name().cmp(b.name()));
    for migration in migrations {
        let name = migration.name().to_owned();
        if applied.contains(&name) {
            debug!(module = module_name, migration = %name, "already applied");
            result.skipped += 1;
            continue;
        }

        info!(module = module_name, migration = %name, "applying migration");
        let failed = |source: DbErr| MigrationError::MigrationFailed {
            module: module_name.to_owned(),
            migration: name.clone(),
            source,
        };

        let txn = conn.begin().await.map_err(failed)?;
        let outcome = async {
            migration.up(&SchemaManager::new(&txn)).await?;
            history.record(&txn, &name).await
        }
        .await;
        if let Err(e) = outcome {
            _ = txn.rollback().await;
            return Err(failed(e));
        }
        txn.commit().await.map_err(failed)?;

        result.applied += 1;
        result.applied_names.push(name);
    }

    info!(
        module = module_name,
        applied = result.applied,
        skipped = result.skipped,
        "migrations complete"
    );
    Ok(result)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn table_name_is_sanitized_and_hashed() {
        let name = history_table_name("conditional-filter");
        assert!(name.starts_with("navexpr_migrations__conditional_filter__"));
        assert_eq!(name.len(), "navexpr_migrations__conditional_filter__".len() + 8);
        assert_ne!(name, history_table_name("conditional_filter"));
        assert!(history_table_name("").starts_with("navexpr_migrations_____"));
    }
}
