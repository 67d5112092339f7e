use navexpr::ExprError;
use navexpr_db::{DbError, MigrationError};
use thiserror::Error;

/// Errors surfaced by the building directory.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error("seeding fixture data failed: {0}")]
    Seed(#[source] sea_orm::DbErr),
}
