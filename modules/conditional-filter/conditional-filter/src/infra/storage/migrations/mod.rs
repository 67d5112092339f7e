use sea_orm_migration::MigrationTrait;

mod initial_001;

/// Schema migrations for this module, in application order.
#[must_use]
pub fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![Box::new(initial_001::Migration)]
}
