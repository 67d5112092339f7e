use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "OB_TBuilding")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "pkBID")]
    pub id: i32,
    #[sea_orm(column_name = "Identifier")]
    pub identity: Uuid,
    #[sea_orm(column_name = "sLongName")]
    pub long_name: Option<String>,
    #[sea_orm(column_name = "BuilderId")]
    pub builder_id: i32,
    #[sea_orm(column_name = "fkMandatorID")]
    pub mandator_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::builder::Entity",
        from = "Column::BuilderId",
        to = "super::builder::Column::Id"
    )]
    Builder,
    #[sea_orm(
        belongs_to = "super::mandator::Entity",
        from = "Column::MandatorId",
        to = "super::mandator::Column::Id"
    )]
    Mandator,
}

impl Related<super::builder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Builder.def()
    }
}

impl Related<super::mandator::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Mandator.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
