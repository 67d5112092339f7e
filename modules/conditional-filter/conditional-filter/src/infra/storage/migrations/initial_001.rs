use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cities::Name).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Builders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Builders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Builders::Name).string())
                    .col(ColumnDef::new(Builders::CityId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("FK_TBuilders_TCities_CityId")
                            .from(Builders::Table, Builders::CityId)
                            .to(Cities::Table, Cities::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Mandators::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Mandators::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Mandators::Identity).uuid().not_null())
                    .col(ColumnDef::new(Mandators::Name).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Buildings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Buildings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Buildings::Identity).uuid().not_null())
                    .col(ColumnDef::new(Buildings::LongName).string())
                    .col(ColumnDef::new(Buildings::BuilderId).integer().not_null())
                    .col(ColumnDef::new(Buildings::MandatorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("FK_OB_TBuilding_TBuilders_BuilderId")
                            .from(Buildings::Table, Buildings::BuilderId)
                            .to(Builders::Table, Builders::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("FK_OB_TBuilding_G_TMandator_fkMandatorID")
                            .from(Buildings::Table, Buildings::MandatorId)
                            .to(Mandators::Table, Mandators::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Buildings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Mandators::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Builders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Cities {
    #[sea_orm(iden = "TCities")]
    Table,
    #[sea_orm(iden = "Id")]
    Id,
    #[sea_orm(iden = "Name")]
    Name,
}

#[derive(DeriveIden)]
enum Builders {
    #[sea_orm(iden = "TBuilders")]
    Table,
    #[sea_orm(iden = "Id")]
    Id,
    #[sea_orm(iden = "Name")]
    Name,
    #[sea_orm(iden = "CityId")]
    CityId,
}

#[derive(DeriveIden)]
enum Mandators {
    #[sea_orm(iden = "G_TMandator")]
    Table,
    #[sea_orm(iden = "pkMandatorID")]
    Id,
    #[sea_orm(iden = "gIdentity")]
    Identity,
    #[sea_orm(iden = "sName")]
    Name,
}

#[derive(DeriveIden)]
enum Buildings {
    #[sea_orm(iden = "OB_TBuilding")]
    Table,
    #[sea_orm(iden = "pkBID")]
    Id,
    #[sea_orm(iden = "Identifier")]
    Identity,
    #[sea_orm(iden = "sLongName")]
    LongName,
    #[sea_orm(iden = "BuilderId")]
    BuilderId,
    #[sea_orm(iden = "fkMandatorID")]
    MandatorId,
}
