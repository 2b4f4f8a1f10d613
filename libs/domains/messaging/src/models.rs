use axum_helpers::JwtClaims;
use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_PAGE_SIZE: usize = 200;

/// Default for `MESSAGING_MAX_CONNECTIONS`
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Default for `MESSAGING_MAX_MESSAGE_LENGTH`, in characters
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;

/// Most message ids accepted by one `delivered` command
pub const MAX_DELIVERY_BATCH: usize = 500;

/// Role name carried by storefront chat tokens
pub const CUSTOMER_ROLE: &str = "customer";

/// Namespace for customer chat ids derived from email addresses
const CUSTOMER_NAMESPACE: Uuid = Uuid::from_u128(0x8d2f_4c1e_5b7a_4e39_9c0d_3a6b_1f2e_7c54);

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_limit() -> usize {
    50
}

pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Stable chat identity of a storefront customer: UUIDv5 of the lowercased email
pub fn customer_id_for_email(email: &str) -> Uuid {
    Uuid::new_v5(&CUSTOMER_NAMESPACE, normalise_email(email).as_bytes())
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "thread_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ThreadStatus {
    #[default]
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "participant_role")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ParticipantRole {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "agent")]
    Agent,
}

/// Ordered: a delivery only ever moves forward
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "delivery_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeliveryStatus {
    #[default]
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "read")]
    Read,
}

/// Who is on the other end of a socket or request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub name: String,
}

impl Identity {
    /// `None` when the subject is not a UUID. Tokens carrying the `customer`
    /// role are customers, every other token is an agent.
    pub fn from_claims(claims: &JwtClaims) -> Option<Self> {
        let role = if claims.has_role(CUSTOMER_ROLE) {
            ParticipantRole::Customer
        } else {
            ParticipantRole::Agent
        };
        Some(Self {
            user_id: claims.user_id()?,
            role,
            name: claims.name.clone(),
        })
    }

    pub fn is_agent(&self) -> bool {
        self.role == ParticipantRole::Agent
    }
}

// Threads

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Thread {
    pub id: Uuid,
    pub subject: String,
    /// Chat identity of the customer, see [`customer_id_for_email`]
    pub customer_id: Option<Uuid>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub status: ThreadStatus,
    pub assigned_to: Option<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(subject: &str, customer_email: &str, customer_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            subject: subject.trim().to_string(),
            customer_id: Some(customer_id_for_email(customer_email)),
            customer_email: normalise_email(customer_email),
            customer_name: customer_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            status: ThreadStatus::Open,
            assigned_to: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateThread) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateThread {
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(max = 100))]
    pub customer_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateThread {
    pub status: Option<ThreadStatus>,
    /// `null` unassigns the thread
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ThreadFilter {
    pub status: Option<ThreadStatus>,
    pub assigned_to: Option<Uuid>,
    pub customer_email: Option<String>,
    /// Only threads this user takes part in; set for customers
    #[serde(skip)]
    pub participant: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for ThreadFilter {
    fn default() -> Self {
        Self {
            status: None,
            assigned_to: None,
            customer_email: None,
            participant: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ThreadFilter {
    /// Everything but `participant`, which needs the participant table
    pub fn matches(&self, thread: &Thread) -> bool {
        if let Some(status) = self.status
            && thread.status != status
        {
            return false;
        }
        if let Some(assigned_to) = self.assigned_to
            && thread.assigned_to != Some(assigned_to)
        {
            return false;
        }
        if let Some(ref email) = self.customer_email
            && thread.customer_email != normalise_email(email)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub thread_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(thread_id: Uuid, user_id: Uuid, role: ParticipantRole) -> Self {
        Self {
            thread_id,
            user_id,
            role,
            joined_at: Utc::now(),
            last_read_at: None,
        }
    }
}

// Messages

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Attachment {
    #[validate(url)]
    pub url: String,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 127))]
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// Ids are UUIDv7, so id order is send order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: ParticipantRole,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(thread_id: Uuid, sender: &Identity, body: String, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::now_v7(),
            thread_id,
            sender_id: sender.user_id,
            sender_role: sender.role,
            body,
            attachments,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct SendMessage {
    /// Trimmed; length is checked against the configured maximum
    pub body: String,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub attachments: Vec<Attachment>,
    /// Echoed back in `message_ack`
    #[validate(length(max = 64))]
    pub client_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct MessagePage {
    /// Only messages older than this message id
    pub before: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for MessagePage {
    fn default() -> Self {
        Self {
            before: None,
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct MarkRead {
    /// Defaults to the latest message of the thread
    pub up_to: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub message_id: Uuid,
    pub recipient_id: Uuid,
    pub status: DeliveryStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Delivery {
    pub fn sent(message_id: Uuid, recipient_id: Uuid) -> Self {
        Self {
            message_id,
            recipient_id,
            status: DeliveryStatus::Sent,
            delivered_at: None,
            read_at: None,
        }
    }

    /// Moves to `status` if that is further along; `false` when nothing changed
    pub fn advance(&mut self, status: DeliveryStatus, at: DateTime<Utc>) -> bool {
        if status <= self.status {
            return false;
        }
        self.status = status;
        if self.delivered_at.is_none() {
            self.delivered_at = Some(at);
        }
        if status == DeliveryStatus::Read {
            self.read_at = Some(at);
        }
        true
    }
}

/// A delivery that moved forward, with what fan-out needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryChange {
    pub message_id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub status: DeliveryStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReadReceipt {
    pub thread_id: Uuid,
    /// Last message covered; `None` when the thread has no messages
    pub up_to: Option<Uuid>,
    /// Deliveries that became `read`
    pub marked: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnreadThread {
    pub thread_id: Uuid,
    pub unread: i64,
}

// Storefront

/// A storefront visitor opening a conversation
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StartConversation {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationStarted {
    pub thread: Thread,
    /// Customer access token for the gateway
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_helpers::TokenKind;

    fn claims(roles: &[&str]) -> JwtClaims {
        JwtClaims {
            sub: Uuid::now_v7().to_string(),
            email: "someone@shop.test".into(),
            name: "Someone".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: i64::MAX,
            iat: 0,
            jti: "jti".into(),
            kind: TokenKind::Access,
        }
    }

    #[test]
    fn test_identity_role_from_claims() {
        let customer = Identity::from_claims(&claims(&["customer"])).unwrap();
        assert_eq!(customer.role, ParticipantRole::Customer);

        let agent = Identity::from_claims(&claims(&["support"])).unwrap();
        assert!(agent.is_agent());

        let mut bad = claims(&["support"]);
        bad.sub = "not-a-uuid".into();
        assert!(Identity::from_claims(&bad).is_none());
    }

    #[test]
    fn test_customer_id_ignores_case_and_whitespace() {
        let a = customer_id_for_email("Jane@Example.com");
        let b = customer_id_for_email("  jane@example.com ");
        assert_eq!(a, b);
        assert_eq!(a.get_version_num(), 5);
        assert_ne!(a, customer_id_for_email("john@example.com"));
    }

    #[test]
    fn test_delivery_never_moves_backwards() {
        let now = Utc::now();
        let mut delivery = Delivery::sent(Uuid::now_v7(), Uuid::now_v7());

        assert!(delivery.advance(DeliveryStatus::Read, now));
        assert_eq!(delivery.delivered_at, Some(now));
        assert_eq!(delivery.read_at, Some(now));

        assert!(!delivery.advance(DeliveryStatus::Delivered, now));
        assert_eq!(delivery.status, DeliveryStatus::Read);
    }

    #[test]
    fn test_new_thread_normalises_customer() {
        let thread = Thread::new(" Where is my order? ", "Jane@Example.com", Some("  ".into()));
        assert_eq!(thread.subject, "Where is my order?");
        assert_eq!(thread.customer_email, "jane@example.com");
        assert_eq!(thread.customer_name, None);
        assert_eq!(thread.customer_id, Some(customer_id_for_email("jane@example.com")));
    }

    #[test]
    fn test_filter_by_email_is_case_insensitive() {
        let thread = Thread::new("Hi", "jane@example.com", None);
        let filter = ThreadFilter {
            customer_email: Some("JANE@example.com".into()),
            ..Default::default()
        };
        assert!(filter.matches(&thread));
    }
}
