use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::BaseRepository;
use sea_orm::sea_query::{Alias, Expr, ExprTrait, NullOrdering, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    Order, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::entity::{message_delivery, support_message, support_thread, thread_participant};
use crate::error::{MessagingError, MessagingResult};
use crate::models::{
    Delivery, DeliveryChange, DeliveryStatus, Message, Participant, Thread, ThreadFilter,
    ThreadStatus, UnreadThread, normalise_email,
};
use crate::repository::MessagingRepository;

const MARK_DELIVERED: &str = r#"
UPDATE message_deliveries d
SET status = 'delivered', delivered_at = $3
FROM support_messages m
WHERE m.id = d.message_id
  AND d.recipient_id = $1
  AND d.message_id = ANY($2)
  AND d.status = 'sent'
RETURNING d.message_id, m.thread_id, m.sender_id
"#;

const MARK_READ: &str = r#"
UPDATE message_deliveries d
SET status = 'read', read_at = $4, delivered_at = COALESCE(d.delivered_at, $4)
FROM support_messages m
WHERE m.id = d.message_id
  AND d.recipient_id = $1
  AND m.thread_id = $2
  AND m.id <= $3
  AND d.status <> 'read'
RETURNING d.message_id, m.thread_id, m.sender_id
"#;

const UNREAD_COUNTS: &str = r#"
SELECT m.thread_id, COUNT(*)::BIGINT AS unread
FROM message_deliveries d
JOIN support_messages m ON m.id = d.message_id
WHERE d.recipient_id = $1 AND d.status <> 'read'
GROUP BY m.thread_id
ORDER BY m.thread_id
"#;

#[derive(Debug, FromQueryResult)]
struct ChangedRow {
    message_id: Uuid,
    thread_id: Uuid,
    sender_id: Uuid,
}

#[derive(Debug, FromQueryResult)]
struct UnreadRow {
    thread_id: Uuid,
    unread: i64,
}

fn changes(
    rows: Vec<ChangedRow>,
    recipient_id: Uuid,
    status: DeliveryStatus,
    at: DateTime<Utc>,
) -> Vec<DeliveryChange> {
    rows.into_iter()
        .map(|row| DeliveryChange {
            message_id: row.message_id,
            thread_id: row.thread_id,
            sender_id: row.sender_id,
            recipient_id,
            status,
            at,
        })
        .collect()
}

/// Threads, participants, messages and deliveries over the `support_*`,
/// `thread_participants` and `message_deliveries` tables
pub struct PgMessagingRepository {
    threads: BaseRepository<support_thread::Entity>,
}

impl PgMessagingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            threads: BaseRepository::new(db),
        }
    }

    fn db(&self) -> &DatabaseConnection {
        self.threads.db()
    }

    fn statement(sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
    }
}

async fn insert_participants<C: ConnectionTrait>(
    conn: &C,
    participants: &[Participant],
) -> MessagingResult<()> {
    if participants.is_empty() {
        return Ok(());
    }
    thread_participant::Entity::insert_many(
        participants.iter().map(thread_participant::ActiveModel::from),
    )
    .on_conflict(
        OnConflict::columns([
            thread_participant::Column::ThreadId,
            thread_participant::Column::UserId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl MessagingRepository for PgMessagingRepository {
    async fn create_thread(
        &self,
        thread: Thread,
        participants: Vec<Participant>,
    ) -> MessagingResult<Thread> {
        let txn = self.db().begin().await?;
        let model = support_thread::Entity::insert(support_thread::ActiveModel::from(&thread))
            .exec_with_returning(&txn)
            .await?;
        insert_participants(&txn, &participants).await?;
        txn.commit().await?;

        tracing::info!(thread_id = %model.id, participants = participants.len(), "Created support thread");
        Ok(model.into())
    }

    async fn get_thread(&self, id: Uuid) -> MessagingResult<Option<Thread>> {
        Ok(self.threads.find_by_id(id).await?.map(Into::into))
    }

    async fn list_threads(&self, filter: ThreadFilter) -> MessagingResult<Vec<Thread>> {
        let mut query = support_thread::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(support_thread::Column::Status.eq(status));
        }
        if let Some(assigned_to) = filter.assigned_to {
            query = query.filter(support_thread::Column::AssignedTo.eq(assigned_to));
        }
        if let Some(ref email) = filter.customer_email {
            query = query.filter(support_thread::Column::CustomerEmail.eq(normalise_email(email)));
        }
        if let Some(user_id) = filter.participant {
            query = query.filter(Expr::cust_with_values(
                "id IN (SELECT thread_id FROM thread_participants WHERE user_id = ?)",
                [user_id],
            ));
        }

        let models = query
            .order_by_with_nulls(
                support_thread::Column::LastMessageAt,
                Order::Desc,
                NullOrdering::Last,
            )
            .order_by_desc(support_thread::Column::CreatedAt)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_thread(&self, thread: Thread) -> MessagingResult<Thread> {
        let model = self
            .threads
            .update(support_thread::ActiveModel::from(&thread))
            .await?;
        tracing::info!(thread_id = %thread.id, status = %thread.status, "Updated support thread");
        Ok(model.into())
    }

    async fn get_participant(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> MessagingResult<Option<Participant>> {
        Ok(thread_participant::Entity::find_by_id((thread_id, user_id))
            .one(self.db())
            .await?
            .map(Into::into))
    }

    async fn add_participant(&self, participant: Participant) -> MessagingResult<Participant> {
        if self.threads.find_by_id(participant.thread_id).await?.is_none() {
            return Err(MessagingError::ThreadNotFound(participant.thread_id));
        }
        insert_participants(self.db(), std::slice::from_ref(&participant)).await?;

        self.get_participant(participant.thread_id, participant.user_id)
            .await?
            .ok_or(MessagingError::ThreadNotFound(participant.thread_id))
    }

    async fn list_participants(&self, thread_id: Uuid) -> MessagingResult<Vec<Participant>> {
        let models = thread_participant::Entity::find()
            .filter(thread_participant::Column::ThreadId.eq(thread_id))
            .order_by_asc(thread_participant::Column::JoinedAt)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn append_message(
        &self,
        message: Message,
        recipients: Vec<Uuid>,
        reopen: bool,
    ) -> MessagingResult<Thread> {
        let txn = self.db().begin().await?;

        support_message::Entity::insert(support_message::ActiveModel::from(&message))
            .exec_without_returning(&txn)
            .await?;

        if !recipients.is_empty() {
            message_delivery::Entity::insert_many(recipients.iter().map(|recipient| {
                message_delivery::ActiveModel::from(&Delivery::sent(message.id, *recipient))
            }))
            .exec_without_returning(&txn)
            .await?;
        }

        let mut update = support_thread::Entity::update_many()
            .col_expr(
                support_thread::Column::LastMessageAt,
                Expr::value(message.created_at),
            )
            .col_expr(
                support_thread::Column::UpdatedAt,
                Expr::value(message.created_at),
            )
            .filter(support_thread::Column::Id.eq(message.thread_id));
        if reopen {
            update = update.col_expr(
                support_thread::Column::Status,
                Expr::val(ThreadStatus::Open.to_string()).cast_as(Alias::new("thread_status")),
            );
        }
        update.exec(&txn).await?;

        let Some(thread) = support_thread::Entity::find_by_id(message.thread_id)
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Err(MessagingError::ThreadNotFound(message.thread_id));
        };

        txn.commit().await?;
        tracing::debug!(
            message_id = %message.id,
            thread_id = %message.thread_id,
            recipients = recipients.len(),
            "Stored support message"
        );
        Ok(thread.into())
    }

    async fn list_messages(
        &self,
        thread_id: Uuid,
        before: Option<Uuid>,
        limit: usize,
    ) -> MessagingResult<Vec<Message>> {
        let mut query =
            support_message::Entity::find().filter(support_message::Column::ThreadId.eq(thread_id));
        if let Some(cursor) = before {
            query = query.filter(support_message::Column::Id.lt(cursor));
        }

        let models = query
            .order_by_desc(support_message::Column::Id)
            .limit(limit as u64)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_deliveries(&self, message_id: Uuid) -> MessagingResult<Vec<Delivery>> {
        let models = message_delivery::Entity::find()
            .filter(message_delivery::Column::MessageId.eq(message_id))
            .order_by_asc(message_delivery::Column::RecipientId)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn mark_delivered(
        &self,
        recipient_id: Uuid,
        message_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    ) -> MessagingResult<Vec<DeliveryChange>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = ChangedRow::find_by_statement(Self::statement(
            MARK_DELIVERED,
            vec![recipient_id.into(), message_ids.into(), at.into()],
        ))
        .all(self.db())
        .await?;
        Ok(changes(rows, recipient_id, DeliveryStatus::Delivered, at))
    }

    async fn mark_read(
        &self,
        recipient_id: Uuid,
        thread_id: Uuid,
        up_to: Uuid,
        at: DateTime<Utc>,
    ) -> MessagingResult<Vec<DeliveryChange>> {
        let txn = self.db().begin().await?;

        let rows = ChangedRow::find_by_statement(Self::statement(
            MARK_READ,
            vec![recipient_id.into(), thread_id.into(), up_to.into(), at.into()],
        ))
        .all(&txn)
        .await?;

        thread_participant::Entity::update_many()
            .col_expr(thread_participant::Column::LastReadAt, Expr::value(at))
            .filter(thread_participant::Column::ThreadId.eq(thread_id))
            .filter(thread_participant::Column::UserId.eq(recipient_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(changes(rows, recipient_id, DeliveryStatus::Read, at))
    }

    async fn unread_counts(&self, recipient_id: Uuid) -> MessagingResult<Vec<UnreadThread>> {
        let rows = UnreadRow::find_by_statement(Self::statement(
            UNREAD_COUNTS,
            vec![recipient_id.into()],
        ))
        .all(self.db())
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| UnreadThread {
                thread_id: row.thread_id,
                unread: row.unread,
            })
            .collect())
    }
}
