//! Fixed fixture data.
//!
//! Two cities, three builders, two mandators owning two buildings each. Only
//! "Two L2" is built by a Leeds builder.

use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, TransactionTrait};
use tracing::{debug, info};
use uuid::Uuid;

use super::entity::{builder, building, city, mandator};

/// Rows inserted by [`seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub cities: usize,
    pub builders: usize,
    pub mandators: usize,
    pub buildings: usize,
}

const CITIES: &[&str] = &["London", "Leeds"];
const BUILDERS: &[(&str, &str)] = &[("Sam", "London"), ("John", "London"), ("Mark", "Leeds")];
const MANDATORS: &[(&str, &[(&str, &str)])] = &[
    ("One", &[("One L1", "Sam"), ("One L2", "Sam")]),
    ("Two", &[("Two L1", "John"), ("Two L2", "Mark")]),
];

/// Insert the fixture rows unless buildings already exist.
///
/// Runs in one transaction; a partial seed is never left behind.
///
/// # Errors
/// Returns the first database error.
pub async fn seed<C>(conn: &C) -> Result<SeedSummary, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let existing = building::Entity::find().count(conn).await?;
    if existing > 0 {
        debug!(existing, "fixture data already present, skipping seed");
        return Ok(SeedSummary::default());
    }

    let txn = conn.begin().await?;
    let mut summary = SeedSummary::default();

    let mut cities = Vec::with_capacity(CITIES.len());
    for name in CITIES {
        let row = city::ActiveModel {
            id: NotSet,
            name: Set(Some((*name).to_owned())),
        }
        .insert(&txn)
        .await?;
        cities.push(row);
    }
    summary.cities = cities.len();

    let mut builders = Vec::with_capacity(BUILDERS.len());
    for (name, city_name) in BUILDERS {
        let city_id = id_by_name(&cities, city_name, |c| (c.id, c.name.as_deref()))?;
        let row = builder::ActiveModel {
            id: NotSet,
            name: Set(Some((*name).to_owned())),
            city_id: Set(city_id),
        }
        .insert(&txn)
        .await?;
        builders.push(row);
    }
    summary.builders = builders.len();

    for (name, buildings) in MANDATORS {
        let owner = mandator::ActiveModel {
            id: NotSet,
            identity: Set(Uuid::new_v4()),
            name: Set(Some((*name).to_owned())),
        }
        .insert(&txn)
        .await?;
        summary.mandators += 1;

        for (long_name, builder_name) in *buildings {
            let builder_id = id_by_name(&builders, builder_name, |b| (b.id, b.name.as_deref()))?;
            building::ActiveModel {
                id: NotSet,
                identity: Set(Uuid::new_v4()),
                long_name: Set(Some((*long_name).to_owned())),
                builder_id: Set(builder_id),
                mandator_id: Set(owner.id),
            }
            .insert(&txn)
            .await?;
            summary.buildings += 1;
        }
    }

    txn.commit().await?;
    info!(
        cities = summary.cities,
        builders = summary.builders,
        mandators = summary.mandators,
        buildings = summary.buildings,
        "seeded fixture data"
    );
    Ok(summary)
}

fn id_by_name<T>(
    rows: &[T],
    name: &str,
    key: impl Fn(&T) -> (i32, Option<&str>),
) -> Result<i32, DbErr> {
    rows.iter()
        .map(&key)
        .find(|(_, n)| *n == Some(name))
        .map(|(id, _)| id)
        .ok_or_else(|| DbErr::RecordNotFound(format!("fixture row {name}")))
}
