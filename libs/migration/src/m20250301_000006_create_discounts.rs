use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

use crate::common::{add_touch_trigger, created_at, drop_touch_trigger};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let kinds = [
            DiscountKind::Percentage,
            DiscountKind::FixedAmount,
            DiscountKind::FreeShipping,
        ];
        manager
            .create_type(
                Type::create()
                    .as_enum(DiscountKind::Enum)
                    .values(kinds)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Discounts::Table)
                    .if_not_exists()
                    .col(pk_uuid(Discounts::Id))
                    .col(string_len(Discounts::Code, 32).unique_key())
                    .col(text_null(Discounts::Description))
                    .col(
                        ColumnDef::new(Discounts::Kind)
                            .enumeration(DiscountKind::Enum, kinds)
                            .not_null(),
                    )
                    .col(big_integer(Discounts::Value).default(0))
                    .col(big_integer(Discounts::MinSubtotalCents).default(0))
                    .col(created_at(Discounts::StartsAt))
                    .col(timestamp_with_time_zone_null(Discounts::EndsAt))
                    .col(integer_null(Discounts::UsageLimit))
                    .col(integer(Discounts::UsageCount).default(0))
                    .col(boolean(Discounts::IsActive).default(true))
                    .col(created_at(Discounts::CreatedAt))
                    .col(created_at(Discounts::UpdatedAt))
                    .check(Expr::cust("usage_limit IS NULL OR usage_count <= usage_limit"))
                    .to_owned(),
            )
            .await?;

        add_touch_trigger(manager, "discounts").await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_touch_trigger(manager, "discounts").await?;
        manager
            .drop_table(Table::drop().table(Discounts::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(DiscountKind::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum DiscountKind {
    #[sea_orm(iden = "discount_kind")]
    Enum,
    Percentage,
    FixedAmount,
    FreeShipping,
}

#[derive(DeriveIden)]
enum Discounts {
    Table,
    Id,
    Code,
    Description,
    Kind,
    Value,
    MinSubtotalCents,
    StartsAt,
    EndsAt,
    UsageLimit,
    UsageCount,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
