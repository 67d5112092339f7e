#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Conditional navigation filter module.
//!
//! Buildings are filtered on `Builder.City.Name` through a null-guarded
//! expression tree and eagerly loaded with their builder, city and mandator.
//! The same predicate can be run in SQL (with or without null-guard folding)
//! or in memory over the loaded graphs; all three must agree.

pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;

pub use config::ConditionalFilterConfig;
pub use domain::graph::{BuilderGraph, BuildingGraph};
pub use domain::predicates::{city_name_predicate, unguarded_city_name_predicate};
pub use domain::service::{BuildingDirectory, Eager, MODULE_NAME};
pub use errors::DomainError;
