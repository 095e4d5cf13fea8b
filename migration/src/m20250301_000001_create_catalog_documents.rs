// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per stored product document, grouped by collection
        manager
            .create_table(
                Table::create()
                    .table(CatalogDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogDocuments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogDocuments::Collection).string().not_null())
                    .col(ColumnDef::new(CatalogDocuments::Body).json().not_null())
                    .col(
                        ColumnDef::new(CatalogDocuments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CatalogDocuments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_documents_collection")
                    .table(CatalogDocuments::Table)
                    .col(CatalogDocuments::Collection)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CatalogDocuments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CatalogDocuments {
    Table,
    Id,
    Collection,
    Body,
    CreatedAt,
    UpdatedAt,
}
