//! Connected sockets and the rooms they belong to.
//!
//! Every client owns an unbounded channel; the gateway drains it into the
//! socket. Emitting to several rooms reaches each client once.

use metrics::{counter, gauge};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{MessagingError, MessagingResult};
use crate::events::ServerEvent;
use crate::models::Identity;

pub type ClientId = Uuid;

/// Serialized events waiting to be written to one socket
pub type ClientReceiver = mpsc::UnboundedReceiver<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Everyone viewing a thread
    Thread(Uuid),
    /// Every socket of one user
    User(Uuid),
    /// Every agent socket
    Agents,
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Thread(id) => write!(f, "thread:{id}"),
            Room::User(id) => write!(f, "user:{id}"),
            Room::Agents => f.write_str("agents"),
        }
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub identity: Identity,
    sender: mpsc::UnboundedSender<String>,
}

impl Client {
    /// `false` once the socket side has gone away
    pub fn send(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.sender.send(json).is_ok(),
            Err(e) => {
                tracing::error!(client_id = %self.id, error = %e, "Failed to encode event");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HubStats {
    /// Open sockets
    pub connections: usize,
    /// Rooms with at least one member
    pub rooms: usize,
    /// Messages stored since start
    pub messages_sent: u64,
    /// Emit calls since start
    pub events_emitted: u64,
    /// Sockets accepted since start
    pub total_connections: u64,
}

#[derive(Debug, Default)]
struct Rooms {
    members: HashMap<Room, HashSet<ClientId>>,
    memberships: HashMap<ClientId, HashSet<Room>>,
}

#[derive(Debug, Default)]
struct Counters {
    messages_sent: u64,
    events_emitted: u64,
    total_connections: u64,
}

#[derive(Debug)]
pub struct Hub {
    clients: RwLock<HashMap<ClientId, Arc<Client>>>,
    rooms: RwLock<Rooms>,
    counters: RwLock<Counters>,
    max_connections: usize,
}

impl Hub {
    pub fn new(max_connections: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            rooms: RwLock::new(Rooms::default()),
            counters: RwLock::new(Counters::default()),
            max_connections,
        }
    }

    pub fn is_full(&self) -> bool {
        self.clients.read().len() >= self.max_connections
    }

    /// Registers a socket and puts it in `user:{id}`, plus `agents` for agents
    pub fn connect(&self, identity: Identity) -> MessagingResult<(Arc<Client>, ClientReceiver)> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let client = Arc::new(Client {
            id: Uuid::new_v4(),
            identity,
            sender,
        });

        {
            let mut clients = self.clients.write();
            if clients.len() >= self.max_connections {
                return Err(MessagingError::AtCapacity);
            }
            clients.insert(client.id, Arc::clone(&client));
            gauge!("messaging_connections").set(clients.len() as f64);
        }
        self.counters.write().total_connections += 1;
        counter!("messaging_connections_total", "role" => client.identity.role.to_string())
            .increment(1);

        self.join(client.id, Room::User(client.identity.user_id));
        if client.identity.is_agent() {
            self.join(client.id, Room::Agents);
        }

        tracing::info!(
            client_id = %client.id,
            user_id = %client.identity.user_id,
            role = %client.identity.role,
            "Client connected"
        );
        Ok((client, receiver))
    }

    /// Drops the client from every room
    pub fn disconnect(&self, client_id: ClientId) {
        let client = {
            let mut clients = self.clients.write();
            let Some(client) = clients.remove(&client_id) else {
                return;
            };
            gauge!("messaging_connections").set(clients.len() as f64);
            client
        };

        let mut rooms = self.rooms.write();
        if let Some(joined) = rooms.memberships.remove(&client_id) {
            for room in joined {
                if let Some(members) = rooms.members.get_mut(&room) {
                    members.remove(&client_id);
                    if members.is_empty() {
                        rooms.members.remove(&room);
                    }
                }
            }
        }

        tracing::info!(client_id = %client_id, user_id = %client.identity.user_id, "Client disconnected");
    }

    /// `true` when the client was not yet a member
    pub fn join(&self, client_id: ClientId, room: Room) -> bool {
        let mut rooms = self.rooms.write();
        let added = rooms.members.entry(room).or_default().insert(client_id);
        rooms.memberships.entry(client_id).or_default().insert(room);
        if added {
            tracing::debug!(client_id = %client_id, room = %room, "Joined room");
        }
        added
    }

    /// `true` when the client was a member
    pub fn leave(&self, client_id: ClientId, room: Room) -> bool {
        let mut rooms = self.rooms.write();
        let removed = match rooms.members.get_mut(&room) {
            Some(members) => {
                let removed = members.remove(&client_id);
                if members.is_empty() {
                    rooms.members.remove(&room);
                }
                removed
            }
            None => false,
        };
        if let Some(joined) = rooms.memberships.get_mut(&client_id) {
            joined.remove(&room);
        }
        if removed {
            tracing::debug!(client_id = %client_id, room = %room, "Left room");
        }
        removed
    }

    pub fn is_member(&self, client_id: ClientId, room: Room) -> bool {
        self.rooms
            .read()
            .members
            .get(&room)
            .is_some_and(|members| members.contains(&client_id))
    }

    pub fn room_size(&self, room: Room) -> usize {
        self.rooms.read().members.get(&room).map_or(0, HashSet::len)
    }

    /// Sends `event` once to every client in any of `rooms`, except
    /// `exclude`. Returns the number of clients reached.
    pub fn emit(&self, rooms: &[Room], event: &ServerEvent, exclude: Option<ClientId>) -> usize {
        let targets: HashSet<ClientId> = {
            let state = self.rooms.read();
            rooms
                .iter()
                .filter_map(|room| state.members.get(room))
                .flatten()
                .copied()
                .filter(|id| Some(*id) != exclude)
                .collect()
        };

        self.counters.write().events_emitted += 1;
        counter!("messaging_events_emitted_total", "event" => event.kind()).increment(1);
        if targets.is_empty() {
            return 0;
        }

        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode event");
                return 0;
            }
        };

        let clients = self.clients.read();
        let reached = targets
            .iter()
            .filter_map(|id| clients.get(id))
            .filter(|client| client.sender.send(json.clone()).is_ok())
            .count();

        tracing::debug!(
            rooms = ?rooms.iter().map(ToString::to_string).collect::<Vec<_>>(),
            event = event.kind(),
            recipients = reached,
            "Event emitted"
        );
        reached
    }

    pub fn record_message(&self) {
        self.counters.write().messages_sent += 1;
        counter!("messaging_messages_total").increment(1);
    }

    pub fn connection_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn stats(&self) -> HubStats {
        let counters = self.counters.read();
        HubStats {
            connections: self.connection_count(),
            rooms: self.rooms.read().members.len(),
            messages_sent: counters.messages_sent,
            events_emitted: counters.events_emitted,
            total_connections: counters.total_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParticipantRole;

    fn identity(role: ParticipantRole) -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            role,
            name: "Someone".into(),
        }
    }

    fn pong_count(rx: &mut ClientReceiver) -> usize {
        let mut n = 0;
        while let Ok(msg) = rx.try_recv() {
            if msg.contains("\"pong\"") {
                n += 1;
            }
        }
        n
    }

    #[test]
    fn test_room_names() {
        let id = Uuid::nil();
        assert_eq!(Room::Thread(id).to_string(), format!("thread:{id}"));
        assert_eq!(Room::User(id).to_string(), format!("user:{id}"));
        assert_eq!(Room::Agents.to_string(), "agents");
    }

    #[test]
    fn test_connect_joins_default_rooms() {
        let hub = Hub::new(10);
        let agent = identity(ParticipantRole::Agent);
        let customer = identity(ParticipantRole::Customer);

        let (a, _ra) = hub.connect(agent.clone()).unwrap();
        let (c, _rc) = hub.connect(customer.clone()).unwrap();

        assert!(hub.is_member(a.id, Room::User(agent.user_id)));
        assert!(hub.is_member(a.id, Room::Agents));
        assert!(hub.is_member(c.id, Room::User(customer.user_id)));
        assert!(!hub.is_member(c.id, Room::Agents));
    }

    #[test]
    fn test_connection_limit() {
        let hub = Hub::new(1);
        let _first = hub.connect(identity(ParticipantRole::Agent)).unwrap();
        assert!(hub.is_full());
        let err = hub.connect(identity(ParticipantRole::Agent)).unwrap_err();
        assert!(matches!(err, MessagingError::AtCapacity));
    }

    #[test]
    fn test_emit_reaches_each_client_once() {
        let hub = Hub::new(10);
        let agent = identity(ParticipantRole::Agent);
        let (client, mut rx) = hub.connect(agent.clone()).unwrap();
        let thread = Uuid::now_v7();
        hub.join(client.id, Room::Thread(thread));

        let reached = hub.emit(
            &[Room::Thread(thread), Room::User(agent.user_id), Room::Agents],
            &ServerEvent::Pong,
            None,
        );
        assert_eq!(reached, 1);
        assert_eq!(pong_count(&mut rx), 1);
    }

    #[test]
    fn test_emit_skips_excluded_client() {
        let hub = Hub::new(10);
        let user = identity(ParticipantRole::Customer);
        let (first, mut rx1) = hub.connect(user.clone()).unwrap();
        let (_second, mut rx2) = hub.connect(user.clone()).unwrap();

        hub.emit(&[Room::User(user.user_id)], &ServerEvent::Pong, Some(first.id));
        assert_eq!(pong_count(&mut rx1), 0);
        assert_eq!(pong_count(&mut rx2), 1);
    }

    #[test]
    fn test_disconnect_leaves_every_room() {
        let hub = Hub::new(10);
        let agent = identity(ParticipantRole::Agent);
        let (client, _rx) = hub.connect(agent).unwrap();
        let thread = Room::Thread(Uuid::now_v7());
        hub.join(client.id, thread);
        assert_eq!(hub.stats().rooms, 3);

        hub.disconnect(client.id);
        assert_eq!(hub.room_size(thread), 0);
        assert_eq!(hub.room_size(Room::Agents), 0);

        let stats = hub.stats();
        assert_eq!(stats.connections, 0);
        assert_eq!(stats.rooms, 0);
        assert_eq!(stats.total_connections, 1);
    }

    #[test]
    fn test_leave_reports_membership() {
        let hub = Hub::new(10);
        let (client, _rx) = hub.connect(identity(ParticipantRole::Agent)).unwrap();
        let room = Room::Thread(Uuid::now_v7());

        assert!(hub.join(client.id, room));
        assert!(!hub.join(client.id, room));
        assert!(hub.leave(client.id, room));
        assert!(!hub.leave(client.id, room));
    }
}
