use axum_helpers::{AuthError, SharedAuthority, ShutdownCoordinator, TokenSubject};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{MessagingError, MessagingResult};
use crate::events::ServerEvent;
use crate::hub::{Client, ClientId, ClientReceiver, Hub, HubStats, Room};
use crate::models::{
    CUSTOMER_ROLE, ConversationStarted, CreateThread, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_MESSAGE_LENGTH, DeliveryChange, Identity, MAX_DELIVERY_BATCH, MAX_PAGE_SIZE,
    Message, MessagePage, Participant, ParticipantRole, ReadReceipt, SendMessage,
    StartConversation, Thread, ThreadFilter, ThreadStatus, UnreadThread, UpdateThread,
    customer_id_for_email,
};
use crate::repository::MessagingRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagingSettings {
    pub max_connections: usize,
    /// In characters, after trimming
    pub max_message_length: usize,
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

fn validation(e: validator::ValidationErrors) -> MessagingError {
    MessagingError::Validation(e.to_string())
}

fn require_agent(identity: &Identity) -> MessagingResult<()> {
    if identity.is_agent() {
        Ok(())
    } else {
        Err(MessagingError::Forbidden("Only support agents can do this".to_string()))
    }
}

/// Threads and messages plus the live fan-out to connected sockets
pub struct MessagingService<R: MessagingRepository> {
    pub(crate) repository: Arc<R>,
    hub: Arc<Hub>,
    authority: SharedAuthority,
    settings: MessagingSettings,
    shutdown: ShutdownCoordinator,
}

impl<R: MessagingRepository> Clone for MessagingService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            hub: Arc::clone(&self.hub),
            authority: Arc::clone(&self.authority),
            settings: self.settings,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<R: MessagingRepository> MessagingService<R> {
    pub fn new(repository: R, authority: SharedAuthority, settings: MessagingSettings) -> Self {
        Self {
            repository: Arc::new(repository),
            hub: Arc::new(Hub::new(settings.max_connections)),
            authority,
            settings,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Sockets close when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub(crate) fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    pub fn stats(&self) -> HubStats {
        self.hub.stats()
    }

    // Connections

    pub async fn authenticate(&self, token: &str) -> MessagingResult<Identity> {
        let claims = self.authority.authenticate(token).await?;
        Identity::from_claims(&claims)
            .ok_or_else(|| AuthError::InvalidToken("subject is not a UUID".to_string()).into())
    }

    /// Registers the socket and greets it with `connected`
    pub fn connect(&self, identity: Identity) -> MessagingResult<(Arc<Client>, ClientReceiver)> {
        let (client, receiver) = self.hub.connect(identity)?;
        client.send(&ServerEvent::Connected {
            client_id: client.id,
            user_id: client.identity.user_id,
        });
        Ok((client, receiver))
    }

    pub fn disconnect(&self, client_id: ClientId) {
        self.hub.disconnect(client_id);
    }

    // Access

    async fn find_thread(&self, id: Uuid) -> MessagingResult<Thread> {
        self.repository
            .get_thread(id)
            .await?
            .ok_or(MessagingError::ThreadNotFound(id))
    }

    async fn is_participant(&self, identity: &Identity, thread_id: Uuid) -> MessagingResult<bool> {
        Ok(self
            .repository
            .get_participant(thread_id, identity.user_id)
            .await?
            .is_some())
    }

    /// Agents see every thread, customers only their own
    async fn accessible_thread(&self, identity: &Identity, id: Uuid) -> MessagingResult<Thread> {
        let thread = self.find_thread(id).await?;
        if !identity.is_agent() && !self.is_participant(identity, id).await? {
            return Err(MessagingError::Forbidden(
                "Not a participant of this thread".to_string(),
            ));
        }
        Ok(thread)
    }

    fn clean_body(&self, body: &str) -> MessagingResult<String> {
        let body = body.trim();
        if body.is_empty() {
            return Err(MessagingError::Validation("Message body is empty".to_string()));
        }
        let max = self.settings.max_message_length;
        if body.chars().count() > max {
            return Err(MessagingError::Validation(format!(
                "Message body exceeds {max} characters"
            )));
        }
        Ok(body.to_string())
    }

    // Threads

    /// An agent opens a thread for a customer email and is assigned to it
    pub async fn open_thread(&self, agent: &Identity, input: CreateThread) -> MessagingResult<Thread> {
        require_agent(agent)?;
        input.validate().map_err(validation)?;

        let mut thread = Thread::new(&input.subject, &input.customer_email, input.customer_name);
        thread.assigned_to = Some(agent.user_id);

        let customer_id = customer_id_for_email(&input.customer_email);
        let participants = vec![
            Participant::new(thread.id, agent.user_id, ParticipantRole::Agent),
            Participant::new(thread.id, customer_id, ParticipantRole::Customer),
        ];
        let thread = self.repository.create_thread(thread, participants).await?;

        self.hub.emit(
            &[Room::Agents],
            &ServerEvent::ThreadUpdated {
                thread: thread.clone(),
            },
            None,
        );
        Ok(thread)
    }

    /// A storefront visitor opens a thread; returns a customer token for the gateway
    pub async fn start_conversation(
        &self,
        input: StartConversation,
    ) -> MessagingResult<ConversationStarted> {
        input.validate().map_err(validation)?;
        let body = self.clean_body(&input.body)?;

        let thread = Thread::new(&input.subject, &input.email, input.name);
        let customer = Identity {
            user_id: customer_id_for_email(&input.email),
            role: ParticipantRole::Customer,
            name: thread
                .customer_name
                .clone()
                .unwrap_or_else(|| thread.customer_email.clone()),
        };

        let participant = Participant::new(thread.id, customer.user_id, ParticipantRole::Customer);
        let thread = self.repository.create_thread(thread, vec![participant]).await?;

        let message = Message::new(thread.id, &customer, body, Vec::new());
        let thread = self.repository.append_message(message, Vec::new(), false).await?;
        self.hub.record_message();

        self.hub.emit(
            &[Room::Agents],
            &ServerEvent::ThreadUpdated {
                thread: thread.clone(),
            },
            None,
        );

        let issued = self
            .authority
            .issue_access_token(&TokenSubject {
                user_id: customer.user_id,
                email: thread.customer_email.clone(),
                name: customer.name,
                roles: vec![CUSTOMER_ROLE.to_string()],
            })
            .await?;

        tracing::info!(thread_id = %thread.id, customer_id = %customer.user_id, "Storefront conversation started");
        Ok(ConversationStarted {
            thread,
            token: issued.token,
        })
    }

    pub async fn list_threads(
        &self,
        identity: &Identity,
        mut filter: ThreadFilter,
    ) -> MessagingResult<Vec<Thread>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        filter.participant = (!identity.is_agent()).then_some(identity.user_id);
        self.repository.list_threads(filter).await
    }

    pub async fn get_thread(&self, identity: &Identity, id: Uuid) -> MessagingResult<Thread> {
        self.accessible_thread(identity, id).await
    }

    /// Status and assignment; broadcast to the thread and to all agents
    pub async fn update_thread(
        &self,
        identity: &Identity,
        id: Uuid,
        update: UpdateThread,
    ) -> MessagingResult<Thread> {
        require_agent(identity)?;
        let mut thread = self.find_thread(id).await?;
        thread.apply_update(update);
        let thread = self.repository.update_thread(thread).await?;

        self.hub.emit(
            &[Room::Thread(id), Room::Agents],
            &ServerEvent::ThreadUpdated {
                thread: thread.clone(),
            },
            None,
        );
        Ok(thread)
    }

    // Rooms

    /// Agents become participants on first join. Replies `joined` with the
    /// caller's unread count in the thread.
    pub async fn join(&self, client: &Client, thread_id: Uuid) -> MessagingResult<i64> {
        let identity = &client.identity;
        self.find_thread(thread_id).await?;

        if identity.is_agent() {
            self.repository
                .add_participant(Participant::new(
                    thread_id,
                    identity.user_id,
                    ParticipantRole::Agent,
                ))
                .await?;
        } else if !self.is_participant(identity, thread_id).await? {
            return Err(MessagingError::Forbidden(
                "Not a participant of this thread".to_string(),
            ));
        }

        self.hub.join(client.id, Room::Thread(thread_id));

        let unread = self
            .repository
            .unread_counts(identity.user_id)
            .await?
            .into_iter()
            .find(|u| u.thread_id == thread_id)
            .map_or(0, |u| u.unread);
        client.send(&ServerEvent::Joined { thread_id, unread });
        Ok(unread)
    }

    pub fn leave(&self, client: &Client, thread_id: Uuid) {
        self.hub.leave(client.id, Room::Thread(thread_id));
        client.send(&ServerEvent::Left { thread_id });
    }

    pub fn typing(&self, client: &Client, thread_id: Uuid, is_typing: bool) -> MessagingResult<()> {
        if !self.hub.is_member(client.id, Room::Thread(thread_id)) {
            return Err(MessagingError::Forbidden(
                "Join the thread first".to_string(),
            ));
        }
        self.hub.emit(
            &[Room::Thread(thread_id)],
            &ServerEvent::Typing {
                thread_id,
                user_id: client.identity.user_id,
                is_typing,
            },
            Some(client.id),
        );
        Ok(())
    }

    // Messages

    /// Socket senders (`origin`) must have joined the thread room; REST
    /// senders must be participants, agents are added on the spot. Closed
    /// threads take no customer messages, an agent message re-opens them.
    pub async fn send_message(
        &self,
        identity: &Identity,
        thread_id: Uuid,
        input: SendMessage,
        origin: Option<&Client>,
    ) -> MessagingResult<Message> {
        input.validate().map_err(validation)?;
        let body = self.clean_body(&input.body)?;
        let thread = self.find_thread(thread_id).await?;

        match origin {
            Some(client) => {
                if !self.hub.is_member(client.id, Room::Thread(thread_id)) {
                    return Err(MessagingError::Forbidden(
                        "Join the thread first".to_string(),
                    ));
                }
            }
            None if identity.is_agent() => {
                self.repository
                    .add_participant(Participant::new(
                        thread_id,
                        identity.user_id,
                        ParticipantRole::Agent,
                    ))
                    .await?;
            }
            None => {
                if !self.is_participant(identity, thread_id).await? {
                    return Err(MessagingError::Forbidden(
                        "Not a participant of this thread".to_string(),
                    ));
                }
            }
        }

        let reopen = thread.status == ThreadStatus::Closed;
        if reopen && !identity.is_agent() {
            return Err(MessagingError::ThreadClosed(thread_id));
        }

        let recipients: Vec<Uuid> = self
            .repository
            .list_participants(thread_id)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .filter(|id| *id != identity.user_id)
            .collect();

        let message = Message::new(thread_id, identity, body, input.attachments);
        let thread = self
            .repository
            .append_message(message.clone(), recipients.clone(), reopen)
            .await?;
        self.hub.record_message();

        if let Some(client) = origin {
            client.send(&ServerEvent::MessageAck {
                client_ref: input.client_ref,
                message: message.clone(),
            });
        }

        let mut rooms = vec![Room::Thread(thread_id)];
        rooms.extend(recipients.iter().map(|id| Room::User(*id)));
        self.hub.emit(
            &rooms,
            &ServerEvent::MessageNew {
                message: message.clone(),
            },
            origin.map(|c| c.id),
        );

        // unassigned customer threads surface in every agent's inbox
        let unassigned = !identity.is_agent() && thread.assigned_to.is_none();
        let thread_event = ServerEvent::ThreadUpdated { thread };
        if reopen {
            self.hub
                .emit(&[Room::Thread(thread_id), Room::Agents], &thread_event, None);
        } else if unassigned {
            self.hub.emit(&[Room::Agents], &thread_event, None);
        }

        tracing::debug!(
            message_id = %message.id,
            thread_id = %thread_id,
            sender_id = %identity.user_id,
            recipients = recipients.len(),
            "Message sent"
        );
        Ok(message)
    }

    /// Newest first
    pub async fn list_messages(
        &self,
        identity: &Identity,
        thread_id: Uuid,
        page: MessagePage,
    ) -> MessagingResult<Vec<Message>> {
        self.accessible_thread(identity, thread_id).await?;
        self.repository
            .list_messages(thread_id, page.before, page.limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    /// Each change is reported to the sender's sockets
    pub async fn mark_delivered(
        &self,
        identity: &Identity,
        mut message_ids: Vec<Uuid>,
    ) -> MessagingResult<Vec<DeliveryChange>> {
        message_ids.sort_unstable();
        message_ids.dedup();
        if message_ids.len() > MAX_DELIVERY_BATCH {
            return Err(MessagingError::Validation(format!(
                "At most {MAX_DELIVERY_BATCH} message ids per batch"
            )));
        }
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let changes = self
            .repository
            .mark_delivered(identity.user_id, message_ids, Utc::now())
            .await?;
        self.notify_senders(&changes);
        Ok(changes)
    }

    /// Marks the caller's deliveries in the thread as read up to `up_to`
    /// (default: the latest message)
    pub async fn mark_read(
        &self,
        identity: &Identity,
        thread_id: Uuid,
        up_to: Option<Uuid>,
    ) -> MessagingResult<ReadReceipt> {
        self.accessible_thread(identity, thread_id).await?;

        let up_to = match up_to {
            Some(id) => Some(id),
            None => self
                .repository
                .list_messages(thread_id, None, 1)
                .await?
                .first()
                .map(|m| m.id),
        };

        let at = Utc::now();
        let changes = match up_to {
            Some(up_to) => {
                self.repository
                    .mark_read(identity.user_id, thread_id, up_to, at)
                    .await?
            }
            None => Vec::new(),
        };

        self.hub.emit(
            &[Room::Thread(thread_id)],
            &ServerEvent::ThreadRead {
                thread_id,
                user_id: identity.user_id,
                up_to,
                at,
            },
            None,
        );
        self.notify_senders(&changes);

        Ok(ReadReceipt {
            thread_id,
            up_to,
            marked: changes.len(),
        })
    }

    fn notify_senders(&self, changes: &[DeliveryChange]) {
        for change in changes {
            self.hub
                .emit(&[Room::User(change.sender_id)], &ServerEvent::from(change), None);
        }
    }

    pub async fn unread(&self, identity: &Identity) -> MessagingResult<Vec<UnreadThread>> {
        self.repository.unread_counts(identity.user_id).await
    }
}
