use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{MessagingError, MessagingResult};
use crate::models::{
    Delivery, DeliveryChange, DeliveryStatus, Message, Participant, Thread, ThreadFilter,
    ThreadStatus, UnreadThread,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingRepository: Send + Sync {
    /// Thread and its first participants, atomically
    async fn create_thread(
        &self,
        thread: Thread,
        participants: Vec<Participant>,
    ) -> MessagingResult<Thread>;

    async fn get_thread(&self, id: Uuid) -> MessagingResult<Option<Thread>>;

    /// Latest activity first, threads without messages last
    async fn list_threads(&self, filter: ThreadFilter) -> MessagingResult<Vec<Thread>>;

    async fn update_thread(&self, thread: Thread) -> MessagingResult<Thread>;

    async fn get_participant(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> MessagingResult<Option<Participant>>;

    /// Inserts unless the user already takes part; returns the stored row
    async fn add_participant(&self, participant: Participant) -> MessagingResult<Participant>;

    async fn list_participants(&self, thread_id: Uuid) -> MessagingResult<Vec<Participant>>;

    /// Stores the message with a `Sent` delivery per recipient and bumps the
    /// thread's `last_message_at` (re-opening it when `reopen`) in one
    /// transaction. Returns the updated thread.
    async fn append_message(
        &self,
        message: Message,
        recipients: Vec<Uuid>,
        reopen: bool,
    ) -> MessagingResult<Thread>;

    /// Newest first; `before` is an exclusive message id cursor
    async fn list_messages(
        &self,
        thread_id: Uuid,
        before: Option<Uuid>,
        limit: usize,
    ) -> MessagingResult<Vec<Message>>;

    async fn list_deliveries(&self, message_id: Uuid) -> MessagingResult<Vec<Delivery>>;

    /// `Sent -> Delivered` for the given messages addressed to `recipient_id`
    async fn mark_delivered(
        &self,
        recipient_id: Uuid,
        message_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    ) -> MessagingResult<Vec<DeliveryChange>>;

    /// Every unread delivery to `recipient_id` in the thread up to and
    /// including message `up_to` becomes `Read`; also stamps the
    /// participant's `last_read_at`
    async fn mark_read(
        &self,
        recipient_id: Uuid,
        thread_id: Uuid,
        up_to: Uuid,
        at: DateTime<Utc>,
    ) -> MessagingResult<Vec<DeliveryChange>>;

    /// Threads with unread messages for `recipient_id`
    async fn unread_counts(&self, recipient_id: Uuid) -> MessagingResult<Vec<UnreadThread>>;
}

#[derive(Debug, Default)]
struct MessagingState {
    threads: HashMap<Uuid, Thread>,
    participants: HashMap<(Uuid, Uuid), Participant>,
    /// Keyed by id, which sorts by send time
    messages: BTreeMap<Uuid, Message>,
    deliveries: HashMap<(Uuid, Uuid), Delivery>,
}

/// In-memory implementation (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessaging {
    state: Arc<RwLock<MessagingState>>,
}

impl InMemoryMessaging {
    pub fn new() -> Self {
        Self::default()
    }
}

fn change(message: &Message, delivery: &Delivery, at: DateTime<Utc>) -> DeliveryChange {
    DeliveryChange {
        message_id: message.id,
        thread_id: message.thread_id,
        sender_id: message.sender_id,
        recipient_id: delivery.recipient_id,
        status: delivery.status,
        at,
    }
}

#[async_trait]
impl MessagingRepository for InMemoryMessaging {
    async fn create_thread(
        &self,
        thread: Thread,
        participants: Vec<Participant>,
    ) -> MessagingResult<Thread> {
        let mut state = self.state.write().await;
        state.threads.insert(thread.id, thread.clone());
        for participant in participants {
            state
                .participants
                .insert((participant.thread_id, participant.user_id), participant);
        }
        tracing::info!(thread_id = %thread.id, "Created support thread");
        Ok(thread)
    }

    async fn get_thread(&self, id: Uuid) -> MessagingResult<Option<Thread>> {
        Ok(self.state.read().await.threads.get(&id).cloned())
    }

    async fn list_threads(&self, filter: ThreadFilter) -> MessagingResult<Vec<Thread>> {
        let state = self.state.read().await;
        let mut result: Vec<Thread> = state
            .threads
            .values()
            .filter(|t| filter.matches(t))
            .filter(|t| match filter.participant {
                Some(user_id) => state.participants.contains_key(&(t.id, user_id)),
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update_thread(&self, thread: Thread) -> MessagingResult<Thread> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(&thread.id) {
            return Err(MessagingError::ThreadNotFound(thread.id));
        }
        state.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn get_participant(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> MessagingResult<Option<Participant>> {
        let state = self.state.read().await;
        Ok(state.participants.get(&(thread_id, user_id)).cloned())
    }

    async fn add_participant(&self, participant: Participant) -> MessagingResult<Participant> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(&participant.thread_id) {
            return Err(MessagingError::ThreadNotFound(participant.thread_id));
        }
        Ok(state
            .participants
            .entry((participant.thread_id, participant.user_id))
            .or_insert(participant)
            .clone())
    }

    async fn list_participants(&self, thread_id: Uuid) -> MessagingResult<Vec<Participant>> {
        let state = self.state.read().await;
        let mut result: Vec<Participant> = state
            .participants
            .values()
            .filter(|p| p.thread_id == thread_id)
            .cloned()
            .collect();
        result.sort_by_key(|p| p.joined_at);
        Ok(result)
    }

    async fn append_message(
        &self,
        message: Message,
        recipients: Vec<Uuid>,
        reopen: bool,
    ) -> MessagingResult<Thread> {
        let mut state = self.state.write().await;

        let thread = state
            .threads
            .get_mut(&message.thread_id)
            .ok_or(MessagingError::ThreadNotFound(message.thread_id))?;
        thread.last_message_at = Some(message.created_at);
        thread.updated_at = message.created_at;
        if reopen {
            thread.status = ThreadStatus::Open;
        }
        let thread = thread.clone();

        for recipient in recipients {
            state
                .deliveries
                .insert((message.id, recipient), Delivery::sent(message.id, recipient));
        }
        state.messages.insert(message.id, message);
        Ok(thread)
    }

    async fn list_messages(
        &self,
        thread_id: Uuid,
        before: Option<Uuid>,
        limit: usize,
    ) -> MessagingResult<Vec<Message>> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .values()
            .rev()
            .filter(|m| m.thread_id == thread_id)
            .filter(|m| before.is_none_or(|cursor| m.id < cursor))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_deliveries(&self, message_id: Uuid) -> MessagingResult<Vec<Delivery>> {
        let state = self.state.read().await;
        let mut result: Vec<Delivery> = state
            .deliveries
            .values()
            .filter(|d| d.message_id == message_id)
            .cloned()
            .collect();
        result.sort_by_key(|d| d.recipient_id);
        Ok(result)
    }

    async fn mark_delivered(
        &self,
        recipient_id: Uuid,
        message_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    ) -> MessagingResult<Vec<DeliveryChange>> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let mut changes = Vec::new();
        for message_id in message_ids {
            let (Some(message), Some(delivery)) = (
                state.messages.get(&message_id),
                state.deliveries.get_mut(&(message_id, recipient_id)),
            ) else {
                continue;
            };
            if delivery.advance(DeliveryStatus::Delivered, at) {
                changes.push(change(message, delivery, at));
            }
        }
        Ok(changes)
    }

    async fn mark_read(
        &self,
        recipient_id: Uuid,
        thread_id: Uuid,
        up_to: Uuid,
        at: DateTime<Utc>,
    ) -> MessagingResult<Vec<DeliveryChange>> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let mut changes = Vec::new();
        for message in state
            .messages
            .range(..=up_to)
            .map(|(_, m)| m)
            .filter(|m| m.thread_id == thread_id)
        {
            if let Some(delivery) = state.deliveries.get_mut(&(message.id, recipient_id))
                && delivery.advance(DeliveryStatus::Read, at)
            {
                changes.push(change(message, delivery, at));
            }
        }

        if let Some(participant) = state.participants.get_mut(&(thread_id, recipient_id)) {
            participant.last_read_at = Some(at);
        }
        Ok(changes)
    }

    async fn unread_counts(&self, recipient_id: Uuid) -> MessagingResult<Vec<UnreadThread>> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<Uuid, i64> = BTreeMap::new();
        for delivery in state
            .deliveries
            .values()
            .filter(|d| d.recipient_id == recipient_id && d.status != DeliveryStatus::Read)
        {
            if let Some(message) = state.messages.get(&delivery.message_id) {
                *counts.entry(message.thread_id).or_insert(0) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(thread_id, unread)| UnreadThread { thread_id, unread })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, ParticipantRole};

    fn identity(role: ParticipantRole) -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            role,
            name: "Someone".into(),
        }
    }

    async fn thread_with(repo: &InMemoryMessaging, people: &[&Identity]) -> Thread {
        let thread = Thread::new("Order question", "jane@example.com", None);
        let participants = people
            .iter()
            .map(|p| Participant::new(thread.id, p.user_id, p.role))
            .collect();
        repo.create_thread(thread, participants).await.unwrap()
    }

    #[tokio::test]
    async fn test_append_creates_sent_deliveries_and_bumps_thread() {
        let repo = InMemoryMessaging::new();
        let customer = identity(ParticipantRole::Customer);
        let agent = identity(ParticipantRole::Agent);
        let thread = thread_with(&repo, &[&customer, &agent]).await;

        let message = Message::new(thread.id, &customer, "Hello".into(), vec![]);
        let updated = repo
            .append_message(message.clone(), vec![agent.user_id], false)
            .await
            .unwrap();

        assert_eq!(updated.last_message_at, Some(message.created_at));
        let deliveries = repo.list_deliveries(message.id).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_read_covers_messages_up_to_cursor_only() {
        let repo = InMemoryMessaging::new();
        let customer = identity(ParticipantRole::Customer);
        let agent = identity(ParticipantRole::Agent);
        let thread = thread_with(&repo, &[&customer, &agent]).await;

        let mut ids = Vec::new();
        for body in ["one", "two", "three"] {
            let message = Message::new(thread.id, &customer, body.into(), vec![]);
            ids.push(message.id);
            repo.append_message(message, vec![agent.user_id], false)
                .await
                .unwrap();
        }

        let changes = repo
            .mark_read(agent.user_id, thread.id, ids[1], Utc::now())
            .await
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.sender_id == customer.user_id));

        let unread = repo.unread_counts(agent.user_id).await.unwrap();
        assert_eq!(unread, vec![UnreadThread { thread_id: thread.id, unread: 1 }]);

        let participant = repo
            .get_participant(thread.id, agent.user_id)
            .await
            .unwrap()
            .unwrap();
        assert!(participant.last_read_at.is_some());
    }

    #[tokio::test]
    async fn test_delivered_after_read_changes_nothing() {
        let repo = InMemoryMessaging::new();
        let customer = identity(ParticipantRole::Customer);
        let agent = identity(ParticipantRole::Agent);
        let thread = thread_with(&repo, &[&customer, &agent]).await;

        let message = Message::new(thread.id, &customer, "Hi".into(), vec![]);
        repo.append_message(message.clone(), vec![agent.user_id], false)
            .await
            .unwrap();
        repo.mark_read(agent.user_id, thread.id, message.id, Utc::now())
            .await
            .unwrap();

        let changes = repo
            .mark_delivered(agent.user_id, vec![message.id], Utc::now())
            .await
            .unwrap();
        assert!(changes.is_empty());

        // the sender has no delivery of their own message
        let changes = repo
            .mark_delivered(customer.user_id, vec![message.id], Utc::now())
            .await
            .unwrap();
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn test_message_cursor_pages_backwards() {
        let repo = InMemoryMessaging::new();
        let customer = identity(ParticipantRole::Customer);
        let thread = thread_with(&repo, &[&customer]).await;

        for n in 0..5 {
            let message = Message::new(thread.id, &customer, format!("m{n}"), vec![]);
            repo.append_message(message, vec![], false).await.unwrap();
        }

        let first = repo.list_messages(thread.id, None, 2).await.unwrap();
        assert_eq!(first[0].body, "m4");
        let next = repo
            .list_messages(thread.id, Some(first[1].id), 10)
            .await
            .unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].body, "m2");
    }

    #[tokio::test]
    async fn test_add_participant_keeps_existing_row() {
        let repo = InMemoryMessaging::new();
        let agent = identity(ParticipantRole::Agent);
        let thread = thread_with(&repo, &[&agent]).await;
        let original = repo
            .get_participant(thread.id, agent.user_id)
            .await
            .unwrap()
            .unwrap();

        let again = repo
            .add_participant(Participant::new(thread.id, agent.user_id, ParticipantRole::Agent))
            .await
            .unwrap();
        assert_eq!(again.joined_at, original.joined_at);

        let err = repo
            .add_participant(Participant::new(Uuid::now_v7(), agent.user_id, ParticipantRole::Agent))
            .await
            .unwrap_err();
        assert!(matches!(err, MessagingError::ThreadNotFound(_)));
    }
}
