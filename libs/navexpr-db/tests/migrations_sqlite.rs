#![allow(clippy::unwrap_used, clippy::expect_used)]

use navexpr_db::{ConnectOpts, DbHandle, MigrationError, run_migrations_for_module};
use sea_orm::{ConnectionTrait, DbErr, Statement};
use sea_orm_migration::{MigrationName, MigrationTrait, SchemaManager};

struct CreateTable {
    name: &'static str,
    fail_after_create: bool,
}

impl MigrationName for CreateTable {
    fn name(&self) -> &str {
        self.name
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        conn.execute_unprepared(&format!(
            "CREATE TABLE \"t_{}\" (id INTEGER PRIMARY KEY)",
            self.name
        ))
        .await?;
        if self.fail_after_create {
            return Err(DbErr::Migration(format!("{} failed on purpose", self.name)));
        }
        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        Ok(())
    }
}

fn ok(name: &'static str) -> Box<dyn MigrationTrait> {
    Box::new(CreateTable {
        name,
        fail_after_create: false,
    })
}

async fn memory_db() -> DbHandle {
    DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("Failed to connect to database")
}

async fn table_exists(db: &DbHandle, table: &str) -> bool {
    let conn = db.sea();
    let row = conn
        .query_one(Statement::from_string(
            conn.get_database_backend(),
            format!("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='{table}'"),
        ))
        .await
        .unwrap()
        .unwrap();
    let count: i32 = row.try_get_by_index(0).unwrap();
    count == 1
}

#[tokio::test]
async fn second_run_skips_applied_migrations() {
    let db = memory_db().await;

    let first = run_migrations_for_module(&db, "fixtures", vec![ok("m002"), ok("m001")])
        .await
        .unwrap();
    assert_eq!(first.applied, 2);
    assert_eq!(first.applied_names, vec!["m001", "m002"]);

    let second = run_migrations_for_module(&db, "fixtures", vec![ok("m001"), ok("m002")])
        .await
        .unwrap();
    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 2);
}

#[tokio::test]
async fn empty_set_is_a_no_op() {
    let db = memory_db().await;
    let result = run_migrations_for_module(&db, "fixtures", vec![]).await.unwrap();
    assert_eq!(result.applied, 0);
    assert_eq!(result.skipped, 0);
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let db = memory_db().await;
    let err = run_migrations_for_module(&db, "fixtures", vec![ok("m001"), ok("m001")])
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::DuplicateMigrationName { .. }));
}

#[tokio::test]
async fn failed_migration_is_rolled_back() {
    let db = memory_db().await;
    let failing: Box<dyn MigrationTrait> = Box::new(CreateTable {
        name: "m002",
        fail_after_create: true,
    });

    let err = run_migrations_for_module(&db, "fixtures", vec![ok("m001"), failing])
        .await
        .unwrap_err();
    match err {
        MigrationError::MigrationFailed { migration, .. } => assert_eq!(migration, "m002"),
        other => panic!("unexpected error: {other}"),
    }

    assert!(table_exists(&db, "t_m001").await);
    assert!(!table_exists(&db, "t_m002").await);

    // The failed migration is retried on the next run.
    let retry = run_migrations_for_module(&db, "fixtures", vec![ok("m001"), ok("m002")])
        .await
        .unwrap();
    assert_eq!(retry.applied_names, vec!["m002"]);
    assert_eq!(retry.skipped, 1);
}

#[tokio::test]
async fn history_table_holds_applied_names() {
    let db = memory_db().await;
    run_migrations_for_module(&db, "fixtures", vec![ok("m002"), ok("m001")])
        .await
        .unwrap();

    let conn = db.sea();
    let backend = conn.get_database_backend();
    let table = conn
        .query_one(Statement::from_string(
            backend,
            "SELECT name FROM sqlite_master WHERE type='table' AND name LIKE 'navexpr_migrations__fixtures__%'",
        ))
        .await
        .unwrap()
        .unwrap();
    let table: String = table.try_get_by_index(0).unwrap();

    let rows = conn
        .query_all(Statement::from_string(
            backend,
            format!("SELECT version, applied_at FROM \"{table}\" ORDER BY version"),
        ))
        .await
        .unwrap();
    let versions: Vec<String> = rows
        .iter()
        .map(|r| r.try_get_by_index(0).unwrap())
        .collect();
    assert_eq!(versions, vec!["m001", "m002"]);
}
