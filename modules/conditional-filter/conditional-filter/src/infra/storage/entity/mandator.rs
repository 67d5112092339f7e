use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// Owning aggregate of buildings.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "G_TMandator")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "pkMandatorID")]
    pub id: i32,
    #[sea_orm(column_name = "gIdentity")]
    pub identity: Uuid,
    #[sea_orm(column_name = "sName")]
    pub name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::building::Entity")]
    Building,
}

impl Related<super::building::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Building.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
