use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ratings point at their target through (content_type, object_id), so no foreign key
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ratings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ratings::ContentType).text().not_null())
                    .col(ColumnDef::new(Ratings::ObjectId).integer().not_null())
                    .col(ColumnDef::new(Ratings::Category).integer().not_null())
                    .col(ColumnDef::new(Ratings::Rating).integer().not_null())
                    .col(ColumnDef::new(Ratings::UserId).integer())
                    .col(ColumnDef::new(Ratings::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_target")
                    .table(Ratings::Table)
                    .col(Ratings::ContentType)
                    .col(Ratings::ObjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ratings {
    Table,
    Id,
    ContentType,
    ObjectId,
    Category,
    Rating,
    UserId,
    CreatedAt,
}
