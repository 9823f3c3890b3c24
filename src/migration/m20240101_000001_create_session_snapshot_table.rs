use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionSnapshot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionSnapshot::Name)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionSnapshot::Version).integer().not_null())
                    .col(ColumnDef::new(SessionSnapshot::Data).binary().not_null())
                    .col(
                        ColumnDef::new(SessionSnapshot::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionSnapshot::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SessionSnapshot {
    Table,
    Name,
    Version,
    Data,
    UpdatedAt,
}
