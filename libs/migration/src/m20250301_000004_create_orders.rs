use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

use crate::common::{add_touch_trigger, created_at, drop_touch_trigger};

#[derive(DeriveMigrationName)]
pub struct Migration;

const STATUSES: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Paid,
    OrderStatus::Fulfilled,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(OrderStatus::Enum)
                    .values(STATUSES)
                    .to_owned(),
            )
            .await?;

        // Display numbers "#001001", "#001002", ...
        manager
            .get_connection()
            .execute_unprepared("CREATE SEQUENCE IF NOT EXISTS order_number_seq START 1001")
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_uuid(Orders::Id))
                    .col(
                        string(Orders::Number)
                            .unique_key()
                            .default(Expr::cust(
                                "'#' || lpad(nextval('order_number_seq')::text, 6, '0')",
                            )),
                    )
                    .col(uuid_null(Orders::CustomerId))
                    .col(string(Orders::CustomerEmail))
                    .col(
                        ColumnDef::new(Orders::Status)
                            .enumeration(OrderStatus::Enum, STATUSES)
                            .not_null()
                            .default("pending"),
                    )
                    .col(json_binary(Orders::Items))
                    .col(big_integer(Orders::SubtotalCents))
                    .col(string_null(Orders::DiscountCode))
                    .col(big_integer(Orders::DiscountCents).default(0))
                    .col(big_integer(Orders::ShippingCents).default(0))
                    .col(big_integer(Orders::TaxCents).default(0))
                    .col(big_integer(Orders::TotalCents))
                    .col(string_len(Orders::Currency, 3).default("USD"))
                    .col(json_binary_null(Orders::ShippingAddress))
                    .col(text_null(Orders::Note))
                    .col(created_at(Orders::PlacedAt))
                    .col(created_at(Orders::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_customer")
                            .from(Orders::Table, Orders::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_orders_status", Orders::Status),
            ("idx_orders_customer_id", Orders::CustomerId),
            ("idx_orders_customer_email", Orders::CustomerEmail),
            ("idx_orders_placed_at", Orders::PlacedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Orders::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        add_touch_trigger(manager, "orders").await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_touch_trigger(manager, "orders").await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP SEQUENCE IF EXISTS order_number_seq")
            .await?;
        manager
            .drop_type(Type::drop().name(OrderStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum OrderStatus {
    #[sea_orm(iden = "order_status")]
    Enum,
    Pending,
    Paid,
    Fulfilled,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

#[derive(DeriveIden, Clone, Copy)]
enum Orders {
    Table,
    Id,
    Number,
    CustomerId,
    CustomerEmail,
    Status,
    Items,
    SubtotalCents,
    DiscountCode,
    DiscountCents,
    ShippingCents,
    TaxCents,
    TotalCents,
    Currency,
    ShippingAddress,
    Note,
    PlacedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
}
