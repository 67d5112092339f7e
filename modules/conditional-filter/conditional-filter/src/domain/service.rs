//! Building directory: the query surface over the seeded store.

use navexpr::{Include, Lambda};
use navexpr_db::{
    DbError, DbHandle, NavQuery, QueryConfig, TranslateOptions, run_migrations_for_module,
};
use sea_orm::{EntityTrait, QueryOrder};
use tracing::info;

use super::graph::BuildingGraph;
use super::model::BUILDING;
use super::predicates::city_name_predicate;
use crate::config::ConditionalFilterConfig;
use crate::errors::DomainError;
use crate::infra::storage::entity::{building, city};
use crate::infra::storage::{migrations, seed};

pub const MODULE_NAME: &str = "conditional-filter";

/// Whether to attach `Builder.City` and `Mandator` to each result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eager {
    None,
    BuilderCityAndMandator,
}

pub struct BuildingDirectory {
    db: DbHandle,
    query: QueryConfig,
}

impl BuildingDirectory {
    /// Connect, migrate and seed.
    ///
    /// # Errors
    /// Returns `DomainError` when any of the three steps fails.
    pub async fn bootstrap(config: &ConditionalFilterConfig) -> Result<Self, DomainError> {
        let db = DbHandle::from_config(&config.database).await?;
        let migrated = run_migrations_for_module(&db, MODULE_NAME, migrations::migrations()).await?;
        let seeded = seed::seed(db.sea()).await.map_err(DomainError::Seed)?;
        info!(
            module = MODULE_NAME,
            applied = migrated.applied,
            buildings = seeded.buildings,
            "building directory ready"
        );
        Ok(Self {
            db,
            query: config.query,
        })
    }

    #[must_use]
    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    #[must_use]
    pub fn translate_options(&self) -> TranslateOptions {
        self.query.translate_options()
    }

    /// `Include(Builder).ThenInclude(City)` and `Include(Mandator)`.
    ///
    /// # Errors
    /// Fails only if the reflection metadata no longer declares the navigations.
    pub fn eager_includes() -> Result<Vec<Include>, DomainError> {
        Ok(vec![
            Include::new(&BUILDING, "Builder")?.then_include("City")?,
            Include::new(&BUILDING, "Mandator")?,
        ])
    }

    /// Query over buildings filtered by `predicate`, with the configured
    /// translation options and the requested includes.
    ///
    /// # Errors
    /// Returns `DomainError` if the predicate is not rooted at buildings.
    pub fn query(
        &self,
        predicate: Lambda,
        eager: Eager,
    ) -> Result<NavQuery<building::Entity>, DomainError> {
        let mut q = NavQuery::new()
            .with_options(self.translate_options())
            .filter(predicate)?;
        if eager == Eager::BuilderCityAndMandator {
            for include in Self::eager_includes()? {
                q = q.include(include)?;
            }
        }
        Ok(q)
    }

    /// Buildings whose builder's city is named `city`, ordered by id.
    ///
    /// # Errors
    /// Returns `DomainError` on translation or database failure.
    pub async fn find_by_city(
        &self,
        city: &str,
        eager: Eager,
    ) -> Result<Vec<BuildingGraph>, DomainError> {
        let q = self.query(city_name_predicate(city)?, eager)?;
        Ok(q.to_list::<BuildingGraph>(self.db.sea()).await?)
    }

    /// Run an arbitrary building predicate in SQL.
    ///
    /// # Errors
    /// Returns `DomainError` on translation or database failure.
    pub async fn find(
        &self,
        predicate: Lambda,
        eager: Eager,
    ) -> Result<Vec<BuildingGraph>, DomainError> {
        let q = self.query(predicate, eager)?;
        Ok(q.to_list::<BuildingGraph>(self.db.sea()).await?)
    }

    /// Evaluate `predicate` in memory over fully loaded graphs.
    ///
    /// # Errors
    /// Returns `DomainError::Db` when evaluation hits an unguarded null
    /// navigation or the load fails.
    pub async fn find_in_memory(&self, predicate: Lambda) -> Result<Vec<BuildingGraph>, DomainError> {
        let q = self.query(predicate, Eager::None)?;
        Ok(q.evaluate_in_memory::<BuildingGraph>(self.db.sea()).await?)
    }

    /// Number of buildings whose builder's city is named `city`.
    ///
    /// # Errors
    /// Returns `DomainError` on translation or database failure.
    pub async fn count_by_city(&self, city: &str) -> Result<u64, DomainError> {
        let q = self.query(city_name_predicate(city)?, Eager::None)?;
        Ok(q.count(self.db.sea()).await?)
    }

    /// All seeded city names, in id order.
    ///
    /// # Errors
    /// Returns `DomainError::Db` on database failure.
    pub async fn city_names(&self) -> Result<Vec<String>, DomainError> {
        let rows = city::Entity::find()
            .order_by_asc(city::Column::Id)
            .all(self.db.sea())
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().filter_map(|c| c.name).collect())
    }
}
