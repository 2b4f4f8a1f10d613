//! Gateway wire format: JSON objects tagged by `type`, snake_case.
//!
//! ```json
//! {"type": "join", "thread_id": "..."}
//! {"type": "send", "thread_id": "...", "body": "Hi", "client_ref": "c1"}
//! {"type": "read", "thread_id": "..."}
//! {"type": "ping"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Attachment, DeliveryChange, DeliveryStatus, Message, Thread};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Join {
        thread_id: Uuid,
    },
    Leave {
        thread_id: Uuid,
    },
    Send {
        thread_id: Uuid,
        body: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
        client_ref: Option<String>,
    },
    Delivered {
        message_ids: Vec<Uuid>,
    },
    Read {
        thread_id: Uuid,
        up_to: Option<Uuid>,
    },
    Typing {
        thread_id: Uuid,
        is_typing: bool,
    },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        client_id: Uuid,
        user_id: Uuid,
    },
    Joined {
        thread_id: Uuid,
        unread: i64,
    },
    Left {
        thread_id: Uuid,
    },
    MessageNew {
        message: Message,
    },
    MessageAck {
        client_ref: Option<String>,
        message: Message,
    },
    DeliveryUpdated {
        message_id: Uuid,
        recipient_id: Uuid,
        status: DeliveryStatus,
        at: DateTime<Utc>,
    },
    ThreadRead {
        thread_id: Uuid,
        user_id: Uuid,
        /// `None` when the thread has no messages yet
        up_to: Option<Uuid>,
        at: DateTime<Utc>,
    },
    Typing {
        thread_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },
    ThreadUpdated {
        thread: Thread,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

impl ServerEvent {
    /// The `type` tag, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::Left { .. } => "left",
            ServerEvent::MessageNew { .. } => "message_new",
            ServerEvent::MessageAck { .. } => "message_ack",
            ServerEvent::DeliveryUpdated { .. } => "delivery_updated",
            ServerEvent::ThreadRead { .. } => "thread_read",
            ServerEvent::Typing { .. } => "typing",
            ServerEvent::ThreadUpdated { .. } => "thread_updated",
            ServerEvent::Error { .. } => "error",
            ServerEvent::Pong => "pong",
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&DeliveryChange> for ServerEvent {
    fn from(change: &DeliveryChange) -> Self {
        ServerEvent::DeliveryUpdated {
            message_id: change.message_id,
            recipient_id: change.recipient_id,
            status: change.status,
            at: change.at,
        }
    }
}
