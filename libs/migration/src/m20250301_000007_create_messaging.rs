use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

use crate::common::{add_touch_trigger, created_at, drop_touch_trigger};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let thread_statuses = [ThreadStatus::Open, ThreadStatus::Pending, ThreadStatus::Closed];
        let roles = [ParticipantRole::Customer, ParticipantRole::Agent];
        let delivery_statuses = [
            DeliveryStatus::Sent,
            DeliveryStatus::Delivered,
            DeliveryStatus::Read,
        ];

        manager
            .create_type(
                Type::create()
                    .as_enum(ThreadStatus::Enum)
                    .values(thread_statuses)
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(ParticipantRole::Enum)
                    .values(roles)
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(DeliveryStatus::Enum)
                    .values(delivery_statuses)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SupportThreads::Table)
                    .if_not_exists()
                    .col(pk_uuid(SupportThreads::Id))
                    .col(string(SupportThreads::Subject))
                    .col(uuid_null(SupportThreads::CustomerId))
                    .col(string(SupportThreads::CustomerEmail))
                    .col(string_null(SupportThreads::CustomerName))
                    .col(
                        ColumnDef::new(SupportThreads::Status)
                            .enumeration(ThreadStatus::Enum, thread_statuses)
                            .not_null()
                            .default("open"),
                    )
                    .col(uuid_null(SupportThreads::AssignedTo))
                    .col(timestamp_with_time_zone_null(SupportThreads::LastMessageAt))
                    .col(created_at(SupportThreads::CreatedAt))
                    .col(created_at(SupportThreads::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_support_threads_status_last_message")
                    .table(SupportThreads::Table)
                    .col(SupportThreads::Status)
                    .col(SupportThreads::LastMessageAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ThreadParticipants::Table)
                    .if_not_exists()
                    .col(uuid(ThreadParticipants::ThreadId))
                    .col(uuid(ThreadParticipants::UserId))
                    .col(
                        ColumnDef::new(ThreadParticipants::Role)
                            .enumeration(ParticipantRole::Enum, roles)
                            .not_null(),
                    )
                    .col(created_at(ThreadParticipants::JoinedAt))
                    .col(timestamp_with_time_zone_null(ThreadParticipants::LastReadAt))
                    .primary_key(
                        Index::create()
                            .col(ThreadParticipants::ThreadId)
                            .col(ThreadParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_thread_participants_thread")
                            .from(ThreadParticipants::Table, ThreadParticipants::ThreadId)
                            .to(SupportThreads::Table, SupportThreads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_thread_participants_user")
                    .table(ThreadParticipants::Table)
                    .col(ThreadParticipants::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SupportMessages::Table)
                    .if_not_exists()
                    .col(pk_uuid(SupportMessages::Id))
                    .col(uuid(SupportMessages::ThreadId))
                    .col(uuid(SupportMessages::SenderId))
                    .col(
                        ColumnDef::new(SupportMessages::SenderRole)
                            .enumeration(ParticipantRole::Enum, roles)
                            .not_null(),
                    )
                    .col(text(SupportMessages::Body))
                    .col(json_binary(SupportMessages::Attachments).default(Expr::cust("'[]'::jsonb")))
                    .col(created_at(SupportMessages::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_support_messages_thread")
                            .from(SupportMessages::Table, SupportMessages::ThreadId)
                            .to(SupportThreads::Table, SupportThreads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_support_messages_thread_id")
                    .table(SupportMessages::Table)
                    .col(SupportMessages::ThreadId)
                    .col(SupportMessages::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MessageDeliveries::Table)
                    .if_not_exists()
                    .col(uuid(MessageDeliveries::MessageId))
                    .col(uuid(MessageDeliveries::RecipientId))
                    .col(
                        ColumnDef::new(MessageDeliveries::Status)
                            .enumeration(DeliveryStatus::Enum, delivery_statuses)
                            .not_null()
                            .default("sent"),
                    )
                    .col(timestamp_with_time_zone_null(MessageDeliveries::DeliveredAt))
                    .col(timestamp_with_time_zone_null(MessageDeliveries::ReadAt))
                    .primary_key(
                        Index::create()
                            .col(MessageDeliveries::MessageId)
                            .col(MessageDeliveries::RecipientId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_deliveries_message")
                            .from(MessageDeliveries::Table, MessageDeliveries::MessageId)
                            .to(SupportMessages::Table, SupportMessages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_deliveries_recipient_status")
                    .table(MessageDeliveries::Table)
                    .col(MessageDeliveries::RecipientId)
                    .col(MessageDeliveries::Status)
                    .to_owned(),
            )
            .await?;

        add_touch_trigger(manager, "support_threads").await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_touch_trigger(manager, "support_threads").await?;

        for table in [
            MessageDeliveries::Table.into_iden(),
            SupportMessages::Table.into_iden(),
            ThreadParticipants::Table.into_iden(),
            SupportThreads::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        for name in [
            DeliveryStatus::Enum.into_iden(),
            ParticipantRole::Enum.into_iden(),
            ThreadStatus::Enum.into_iden(),
        ] {
            manager.drop_type(Type::drop().name(name).to_owned()).await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum ThreadStatus {
    #[sea_orm(iden = "thread_status")]
    Enum,
    Open,
    Pending,
    Closed,
}

#[derive(DeriveIden, Clone, Copy)]
enum ParticipantRole {
    #[sea_orm(iden = "participant_role")]
    Enum,
    Customer,
    Agent,
}

#[derive(DeriveIden, Clone, Copy)]
enum DeliveryStatus {
    #[sea_orm(iden = "delivery_status")]
    Enum,
    Sent,
    Delivered,
    Read,
}

#[derive(DeriveIden)]
enum SupportThreads {
    Table,
    Id,
    Subject,
    CustomerId,
    CustomerEmail,
    CustomerName,
    Status,
    AssignedTo,
    LastMessageAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ThreadParticipants {
    Table,
    ThreadId,
    UserId,
    Role,
    JoinedAt,
    LastReadAt,
}

#[derive(DeriveIden)]
enum SupportMessages {
    Table,
    Id,
    ThreadId,
    SenderId,
    SenderRole,
    Body,
    Attachments,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MessageDeliveries {
    Table,
    MessageId,
    RecipientId,
    Status,
    DeliveredAt,
    ReadAt,
}
