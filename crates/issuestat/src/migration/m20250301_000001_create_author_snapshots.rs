//! Initial migration creating the author snapshot history table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthorSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthorSnapshots::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuthorSnapshots::Owner).string().not_null())
                    .col(ColumnDef::new(AuthorSnapshots::Repo).string().not_null())
                    .col(
                        ColumnDef::new(AuthorSnapshots::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuthorSnapshots::WindowStart).date().not_null())
                    .col(ColumnDef::new(AuthorSnapshots::WindowEnd).date().not_null())
                    .col(ColumnDef::new(AuthorSnapshots::Age).string().not_null())
                    .col(
                        ColumnDef::new(AuthorSnapshots::TopOpened)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(AuthorSnapshots::TopClosed)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_author_snapshots_owner_repo")
                    .table(AuthorSnapshots::Table)
                    .col(AuthorSnapshots::Owner)
                    .col(AuthorSnapshots::Repo)
                    .col(AuthorSnapshots::RecordedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthorSnapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "author_snapshots")]
enum AuthorSnapshots {
    Table,
    Id,
    Owner,
    Repo,
    RecordedAt,
    WindowStart,
    WindowEnd,
    Age,
    TopOpened,
    TopClosed,
}
