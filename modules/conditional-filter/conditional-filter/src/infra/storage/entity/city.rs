use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "TCities")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "Id")]
    pub id: i32,
    #[sea_orm(column_name = "Name")]
    pub name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::builder::Entity")]
    Builder,
}

impl Related<super::builder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Builder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
