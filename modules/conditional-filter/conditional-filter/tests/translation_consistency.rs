#![allow(clippy::unwrap_used, clippy::expect_used)]

use conditional_filter::domain::model::{BUILDER, BUILDING, CITY};
use conditional_filter::infra::storage::entity::{builder, building, city, mandator};
use conditional_filter::infra::storage::migrations::migrations;
use conditional_filter::{
    BuildingDirectory, BuildingGraph, ConditionalFilterConfig, DomainError, Eager, MODULE_NAME,
    city_name_predicate, unguarded_city_name_predicate,
};
use navexpr::{Expr, ExprResult, ExprType, Include, Lambda, ScalarKind};
use navexpr_db::{DbError, NavQuery, TranslateOptions, run_migrations_for_module};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, DbBackend, EntityTrait};
use uuid::Uuid;

async fn directory() -> anyhow::Result<BuildingDirectory> {
    Ok(BuildingDirectory::bootstrap(&ConditionalFilterConfig::default()).await?)
}

fn ids(graphs: &[BuildingGraph]) -> Vec<i32> {
    graphs.iter().map(|g| g.building.id).collect()
}

const FOLDED: TranslateOptions = TranslateOptions {
    fold_null_guards: true,
};

#[tokio::test]
async fn sql_agrees_with_in_memory_evaluation_for_every_city() -> anyhow::Result<()> {
    let dir = directory().await?;
    let mut cities = dir.city_names().await?;
    cities.push("Paris".to_owned());

    for city in &cities {
        let predicate = city_name_predicate(city)?;
        let in_sql = dir.find(predicate.clone(), Eager::None).await?;
        let in_memory = dir.find_in_memory(predicate).await?;
        assert_eq!(ids(&in_sql), ids(&in_memory), "{city}");
        assert!(in_memory.iter().all(|g| g.city_name() == Some(city.as_str())));
    }
    Ok(())
}

/// Adds a building whose builder's city has no name; returns its id.
async fn add_building_in_unnamed_city(dir: &BuildingDirectory) -> anyhow::Result<i32> {
    let conn = dir.db().sea();
    let city = city::ActiveModel {
        id: NotSet,
        name: Set(None),
    }
    .insert(conn)
    .await?;
    let builder = builder::ActiveModel {
        id: NotSet,
        name: Set(Some("Nameless".to_owned())),
        city_id: Set(city.id),
    }
    .insert(conn)
    .await?;
    let owner = mandator::Entity::find()
        .one(conn)
        .await?
        .expect("seeded mandator");
    let row = building::ActiveModel {
        id: NotSet,
        identity: Set(Uuid::new_v4()),
        long_name: Set(Some("Nowhere".to_owned())),
        builder_id: Set(builder.id),
        mandator_id: Set(owner.id),
    }
    .insert(conn)
    .await?;
    Ok(row.id)
}

/// `IIF((IIF((s.Builder == null), null, s.Builder.City) == null), null, s.Builder.City.Name)`
fn guarded_city_name(s: &Expr) -> ExprResult<Expr> {
    let builder = Expr::member_access(s.clone(), "Builder")?;
    let city_nav = Expr::member_access(builder.clone(), "City")?;
    let name = Expr::member_access(city_nav.clone(), "Name")?;
    let city_or_null = Expr::condition(
        Expr::equal(builder, Expr::null_entity(&BUILDER))?,
        Expr::null_entity(&CITY),
        city_nav,
    )?;
    Expr::condition(
        Expr::equal(city_or_null, Expr::null_entity(&CITY))?,
        Expr::null_of(ExprType::Scalar(ScalarKind::String)),
        name,
    )
}

#[tokio::test]
async fn null_city_name_is_handled_alike_in_sql_and_in_memory() -> anyhow::Result<()> {
    let dir = directory().await?;
    let conn = dir.db().sea();
    let leeds = ids(&dir.find_by_city("Leeds", Eager::None).await?);
    let nameless = add_building_in_unnamed_city(&dir).await?;

    let s = Expr::parameter("s", &BUILDING);
    let name = guarded_city_name(&s)?;
    let null_name = Expr::null_of(ExprType::Scalar(ScalarKind::String));
    let cases = [
        ("== Leeds", city_name_predicate("Leeds")?),
        (
            "== null",
            Lambda::predicate(s.clone(), Expr::equal(name.clone(), null_name)?)?,
        ),
        (
            "!= Leeds",
            Lambda::predicate(s.clone(), Expr::not_equal(name.clone(), Expr::string("Leeds"))?)?,
        ),
        (
            "!(== Leeds)",
            Lambda::predicate(
                s.clone(),
                Expr::not(Expr::equal(name, Expr::string("Leeds"))?)?,
            )?,
        ),
    ];

    for (label, predicate) in cases {
        let in_memory = ids(&dir.find_in_memory(predicate.clone()).await?);
        let query = dir.query(predicate, Eager::BuilderCityAndMandator)?;
        let unfolded = query
            .clone()
            .with_options(TranslateOptions::default())
            .to_list::<BuildingGraph>(conn)
            .await?;
        let folded = query.with_options(FOLDED).to_list::<BuildingGraph>(conn).await?;
        assert_eq!(ids(&unfolded), in_memory, "{label} unfolded");
        assert_eq!(ids(&folded), in_memory, "{label} folded");

        match label {
            "== Leeds" => assert_eq!(in_memory, leeds),
            "== null" => assert_eq!(in_memory, vec![nameless]),
            _ => {
                assert!(in_memory.contains(&nameless), "{label}");
                assert!(leeds.iter().all(|id| !in_memory.contains(id)), "{label}");
                assert_eq!(in_memory.len(), 4, "{label}");
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn folded_and_unfolded_translation_return_the_same_rows() -> anyhow::Result<()> {
    let dir = directory().await?;
    let conn = dir.db().sea();

    for city in ["London", "Leeds", "Paris"] {
        let guarded = dir.query(city_name_predicate(city)?, Eager::BuilderCityAndMandator)?;
        let unfolded = guarded
            .clone()
            .with_options(TranslateOptions::default())
            .to_list::<BuildingGraph>(conn)
            .await?;
        let folded = guarded.with_options(FOLDED).to_list::<BuildingGraph>(conn).await?;
        assert_eq!(unfolded, folded, "{city}");

        let unguarded = dir
            .find(unguarded_city_name_predicate(city)?, Eager::BuilderCityAndMandator)
            .await?;
        assert_eq!(ids(&unguarded), ids(&folded), "{city}");
    }
    Ok(())
}

#[tokio::test]
async fn generated_sql_joins_each_navigation_once() -> anyhow::Result<()> {
    let dir = directory().await?;
    let query = dir.query(city_name_predicate("Leeds")?, Eager::BuilderCityAndMandator)?;

    let sql = query.to_sql(DbBackend::Sqlite)?;
    assert_eq!(sql.matches("LEFT JOIN").count(), 2, "{sql}");
    assert!(sql.contains(r#"LEFT JOIN "TBuilders" AS "t0""#), "{sql}");
    assert!(sql.contains(r#"LEFT JOIN "TCities" AS "t1""#), "{sql}");
    assert!(sql.contains("CASE WHEN"), "{sql}");
    assert!(sql.ends_with(r#"ORDER BY "OB_TBuilding"."pkBID" ASC"#), "{sql}");
    assert!(!sql.contains("G_TMandator"), "includes must not join: {sql}");

    let folded = query.with_options(FOLDED).to_sql(DbBackend::Sqlite)?;
    assert_eq!(folded.matches("LEFT JOIN").count(), 2, "{folded}");
    assert!(!folded.contains("CASE"), "{folded}");
    Ok(())
}

#[tokio::test]
async fn unsupported_include_is_rejected() -> anyhow::Result<()> {
    let dir = directory().await?;
    let include = Include::new(&BUILDING, "Mandator")?.then_include("Buildings")?;
    let query = NavQuery::<building::Entity>::new()
        .filter(city_name_predicate("Leeds")?)?
        .include(include)?;

    let err = query
        .to_list::<BuildingGraph>(dir.db().sea())
        .await
        .unwrap_err();
    match err {
        DbError::UnsupportedInclude { root, path } => {
            assert_eq!(root, "TBuilding");
            assert_eq!(path, "Mandator.Buildings");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn predicate_over_another_root_is_rejected() -> anyhow::Result<()> {
    let c = Expr::parameter("c", &CITY);
    let name = Expr::member_access(c.clone(), "Name")?;
    let city_filter = Lambda::predicate(c, Expr::equal(name, Expr::string("Leeds"))?)?;

    let err = NavQuery::<building::Entity>::new()
        .filter(city_filter)
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::RootMismatch {
            expected: "TBuilding",
            got: "TCity"
        }
    ));

    let dir = directory().await?;
    let c = Expr::parameter("c", &CITY);
    let name = Expr::member_access(c.clone(), "Name")?;
    let city_filter = Lambda::predicate(c, Expr::equal(name, Expr::string("Leeds"))?)?;
    let err = dir.find(city_filter, Eager::None).await.err().unwrap();
    assert!(matches!(err, DomainError::Db(DbError::RootMismatch { .. })));
    Ok(())
}

#[tokio::test]
async fn bootstrap_steps_are_idempotent() -> anyhow::Result<()> {
    let dir = directory().await?;

    let rerun = run_migrations_for_module(dir.db(), MODULE_NAME, migrations()).await?;
    assert_eq!(rerun.applied, 0);
    assert_eq!(rerun.skipped, 1);

    let reseeded =
        conditional_filter::infra::storage::seed::seed(dir.db().sea()).await?;
    assert_eq!(reseeded.buildings, 0);
    assert_eq!(dir.count_by_city("London").await?, 3);
    Ok(())
}
