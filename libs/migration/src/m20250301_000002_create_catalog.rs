use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

use crate::common::{add_touch_trigger, created_at, drop_touch_trigger, text_array};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ProductStatus::Enum)
                    .values([
                        ProductStatus::Draft,
                        ProductStatus::Active,
                        ProductStatus::Archived,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_uuid(Categories::Id))
                    .col(string(Categories::Name))
                    .col(string(Categories::Slug).unique_key())
                    .col(text(Categories::Description).default(""))
                    .col(uuid_null(Categories::ParentId))
                    .col(integer(Categories::Position).default(0))
                    .col(created_at(Categories::CreatedAt))
                    .col(created_at(Categories::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_parent")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(pk_uuid(Products::Id))
                    .col(string(Products::Title))
                    .col(string(Products::Slug).unique_key())
                    .col(string_len(Products::Sku, 64).unique_key())
                    .col(text(Products::Description).default(""))
                    .col(big_integer(Products::PriceCents).check(Expr::col(Products::PriceCents).gte(0)))
                    .col(big_integer_null(Products::CompareAtPriceCents))
                    .col(string_len(Products::Currency, 3).default("USD"))
                    .col(integer(Products::Stock).default(0).check(Expr::col(Products::Stock).gte(0)))
                    .col(
                        ColumnDef::new(Products::Status)
                            .enumeration(
                                ProductStatus::Enum,
                                [
                                    ProductStatus::Draft,
                                    ProductStatus::Active,
                                    ProductStatus::Archived,
                                ],
                            )
                            .not_null()
                            .default("draft"),
                    )
                    .col(uuid_null(Products::CategoryId))
                    .col(text_array(Products::Tags))
                    .col(json_binary(Products::Images).default(Expr::cust("'[]'::jsonb")))
                    .col(created_at(Products::CreatedAt))
                    .col(created_at(Products::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category")
                            .from(Products::Table, Products::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_products_status", Products::Status),
            ("idx_products_category_id", Products::CategoryId),
            ("idx_products_created_at", Products::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Products::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Collections::Table)
                    .if_not_exists()
                    .col(pk_uuid(Collections::Id))
                    .col(string(Collections::Title))
                    .col(string(Collections::Slug).unique_key())
                    .col(text(Collections::Description).default(""))
                    .col(string_null(Collections::ImageUrl))
                    .col(boolean(Collections::IsPublished).default(false))
                    .col(created_at(Collections::CreatedAt))
                    .col(created_at(Collections::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CollectionProducts::Table)
                    .if_not_exists()
                    .col(uuid(CollectionProducts::CollectionId))
                    .col(uuid(CollectionProducts::ProductId))
                    .col(created_at(CollectionProducts::AddedAt))
                    .primary_key(
                        Index::create()
                            .col(CollectionProducts::CollectionId)
                            .col(CollectionProducts::ProductId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collection_products_collection")
                            .from(CollectionProducts::Table, CollectionProducts::CollectionId)
                            .to(Collections::Table, Collections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collection_products_product")
                            .from(CollectionProducts::Table, CollectionProducts::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Search candidates are fetched with ILIKE; trigram indexes keep that cheap
        let db = manager.get_connection();
        db.execute_unprepared("CREATE EXTENSION IF NOT EXISTS pg_trgm")
            .await?;
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_products_title_trgm ON products USING gin (title gin_trgm_ops)",
        )
        .await?;

        for table in ["categories", "products", "collections"] {
            add_touch_trigger(manager, table).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["categories", "products", "collections"] {
            drop_touch_trigger(manager, table).await?;
        }

        manager
            .drop_table(Table::drop().table(CollectionProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Collections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ProductStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductStatus {
    #[sea_orm(iden = "product_status")]
    Enum,
    Draft,
    Active,
    Archived,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
    Description,
    ParentId,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Products {
    Table,
    Id,
    Title,
    Slug,
    Sku,
    Description,
    PriceCents,
    CompareAtPriceCents,
    Currency,
    Stock,
    Status,
    CategoryId,
    Tags,
    Images,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Collections {
    Table,
    Id,
    Title,
    Slug,
    Description,
    ImageUrl,
    IsPublished,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CollectionProducts {
    Table,
    CollectionId,
    ProductId,
    AddedAt,
}
