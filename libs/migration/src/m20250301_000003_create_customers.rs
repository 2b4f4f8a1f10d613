use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

use crate::common::{add_touch_trigger, created_at, drop_touch_trigger, text_array};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(pk_uuid(Customers::Id))
                    .col(string(Customers::Email).unique_key())
                    .col(string(Customers::FirstName).default(""))
                    .col(string(Customers::LastName).default(""))
                    .col(string_null(Customers::Phone))
                    .col(boolean(Customers::AcceptsMarketing).default(false))
                    .col(text_array(Customers::Tags))
                    .col(text_null(Customers::Note))
                    .col(created_at(Customers::CreatedAt))
                    .col(created_at(Customers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customers_created_at")
                    .table(Customers::Table)
                    .col(Customers::CreatedAt)
                    .to_owned(),
            )
            .await?;

        let statuses = [
            ContactStatus::New,
            ContactStatus::Read,
            ContactStatus::Replied,
            ContactStatus::Archived,
        ];
        manager
            .create_type(
                Type::create()
                    .as_enum(ContactStatus::Enum)
                    .values(statuses)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactMessages::Table)
                    .if_not_exists()
                    .col(pk_uuid(ContactMessages::Id))
                    .col(string(ContactMessages::Name))
                    .col(string(ContactMessages::Email))
                    .col(string(ContactMessages::Subject).default(""))
                    .col(text(ContactMessages::Body))
                    .col(
                        ColumnDef::new(ContactMessages::Status)
                            .enumeration(ContactStatus::Enum, statuses)
                            .not_null()
                            .default("new"),
                    )
                    .col(created_at(ContactMessages::CreatedAt))
                    .col(created_at(ContactMessages::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contact_messages_status")
                    .table(ContactMessages::Table)
                    .col(ContactMessages::Status)
                    .to_owned(),
            )
            .await?;

        add_touch_trigger(manager, "customers").await?;
        add_touch_trigger(manager, "contact_messages").await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_touch_trigger(manager, "contact_messages").await?;
        drop_touch_trigger(manager, "customers").await?;

        manager
            .drop_table(Table::drop().table(ContactMessages::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(ContactStatus::Enum).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    Phone,
    AcceptsMarketing,
    Tags,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum ContactStatus {
    #[sea_orm(iden = "contact_status")]
    Enum,
    New,
    Read,
    Replied,
    Archived,
}

#[derive(DeriveIden)]
enum ContactMessages {
    Table,
    Id,
    Name,
    Email,
    Subject,
    Body,
    Status,
    CreatedAt,
    UpdatedAt,
}
