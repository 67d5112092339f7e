//! Materialized building graphs.
//!
//! A [`BuildingGraph`] is a root row plus whichever navigations were
//! requested. Navigations that were not loaded read as absent.

use async_trait::async_trait;
use navexpr::{ExprError, ExprResult, Includes, MemberInfo, Navigable, TypeInfo, Value};
use navexpr_db::Materialize;
use sea_orm::{DatabaseConnection, LoaderTrait};
use tracing::debug;

use super::model::{BUILDER, BUILDING, CITY, MANDATOR};
use crate::infra::storage::entity::{builder, building, city, mandator};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuilderGraph {
    pub builder: builder::Model,
    pub city: Option<city::Model>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildingGraph {
    pub building: building::Model,
    pub builder: Option<BuilderGraph>,
    pub mandator: Option<mandator::Model>,
}

impl BuildingGraph {
    /// Root row without navigations.
    #[must_use]
    pub fn bare(building: building::Model) -> Self {
        Self {
            building,
            builder: None,
            mandator: None,
        }
    }

    #[must_use]
    pub fn long_name(&self) -> Option<&str> {
        self.building.long_name.as_deref()
    }

    /// `Builder.City.Name`, if loaded.
    #[must_use]
    pub fn city_name(&self) -> Option<&str> {
        self.builder
            .as_ref()
            .and_then(|b| b.city.as_ref())
            .and_then(|c| c.name.as_deref())
    }
}

fn unknown(info: &'static TypeInfo, member: &MemberInfo) -> ExprError {
    ExprError::UnknownMember {
        type_name: info.name,
        member: member.name.to_owned(),
    }
}

impl Navigable for city::Model {
    fn type_info(&self) -> &'static TypeInfo {
        &CITY
    }

    fn scalar(&self, member: &MemberInfo) -> ExprResult<Value> {
        match member.name {
            "Id" => Ok(self.id.into()),
            "Name" => Ok(self.name.clone().into()),
            _ => Err(unknown(&CITY, member)),
        }
    }
}

impl Navigable for mandator::Model {
    fn type_info(&self) -> &'static TypeInfo {
        &MANDATOR
    }

    fn scalar(&self, member: &MemberInfo) -> ExprResult<Value> {
        match member.name {
            "Id" => Ok(self.id.into()),
            "Identity" => Ok(self.identity.into()),
            "Name" => Ok(self.name.clone().into()),
            _ => Err(unknown(&MANDATOR, member)),
        }
    }
}

impl Navigable for BuilderGraph {
    fn type_info(&self) -> &'static TypeInfo {
        &BUILDER
    }

    fn scalar(&self, member: &MemberInfo) -> ExprResult<Value> {
        let b = &self.builder;
        match member.name {
            "Id" => Ok(b.id.into()),
            "Name" => Ok(b.name.clone().into()),
            "CityId" => Ok(b.city_id.into()),
            _ => Err(unknown(&BUILDER, member)),
        }
    }

    fn reference(&self, member: &MemberInfo) -> ExprResult<Option<&dyn Navigable>> {
        match member.name {
            "City" => Ok(self.city.as_ref().map(|c| c as &dyn Navigable)),
            _ => Err(unknown(&BUILDER, member)),
        }
    }
}

impl Navigable for BuildingGraph {
    fn type_info(&self) -> &'static TypeInfo {
        &BUILDING
    }

    fn scalar(&self, member: &MemberInfo) -> ExprResult<Value> {
        let b = &self.building;
        match member.name {
            "Id" => Ok(b.id.into()),
            "Identity" => Ok(b.identity.into()),
            "LongName" => Ok(b.long_name.clone().into()),
            "BuilderId" => Ok(b.builder_id.into()),
            "MandatorId" => Ok(b.mandator_id.into()),
            _ => Err(unknown(&BUILDING, member)),
        }
    }

    fn reference(&self, member: &MemberInfo) -> ExprResult<Option<&dyn Navigable>> {
        match member.name {
            "Builder" => Ok(self.builder.as_ref().map(|b| b as &dyn Navigable)),
            "Mandator" => Ok(self.mandator.as_ref().map(|m| m as &dyn Navigable)),
            _ => Err(unknown(&BUILDING, member)),
        }
    }
}

#[async_trait]
impl Materialize for BuildingGraph {
    type Entity = building::Entity;

    const INCLUDABLE: &'static [&'static [&'static str]] = &[&["Builder", "City"], &["Mandator"]];

    async fn materialize(
        conn: &DatabaseConnection,
        roots: Vec<building::Model>,
        includes: &Includes,
    ) -> navexpr_db::Result<Vec<Self>> {
        if roots.is_empty() {
            return Ok(Vec::new());
        }

        let builders = if includes.contains(&["Builder"]) {
            load_builders(conn, &roots, includes.contains(&["Builder", "City"])).await?
        } else {
            vec![None; roots.len()]
        };

        let mandators = if includes.contains(&["Mandator"]) {
            roots.load_one(mandator::Entity, conn).await?
        } else {
            vec![None; roots.len()]
        };

        debug!(
            roots = roots.len(),
            builders = builders.iter().flatten().count(),
            mandators = mandators.iter().flatten().count(),
            "materialized building graphs"
        );

        Ok(roots
            .into_iter()
            .zip(builders)
            .zip(mandators)
            .map(|((building, builder), mandator)| Self {
                building,
                builder,
                mandator,
            })
            .collect())
    }
}

async fn load_builders(
    conn: &DatabaseConnection,
    roots: &[building::Model],
    with_city: bool,
) -> navexpr_db::Result<Vec<Option<BuilderGraph>>> {
    let builders = roots.load_one(builder::Entity, conn).await?;

    let present: Vec<builder::Model> = builders.iter().flatten().cloned().collect();
    let mut cities = if with_city && !present.is_empty() {
        present.load_one(city::Entity, conn).await?
    } else {
        vec![None; present.len()]
    }
    .into_iter();

    Ok(builders
        .into_iter()
        .map(|b| {
            b.map(|builder| BuilderGraph {
                builder,
                city: cities.next().flatten(),
            })
        })
        .collect())
}
