use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_PAGE_SIZE: usize = 200;

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

/// Trimmed, lowercased, blanks and duplicates dropped, first occurrence kept
pub fn normalise_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

// Customers

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    /// Lowercased, unique
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub accepts_marketing: bool,
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(input: CreateCustomer) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: normalise_email(&input.email),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            accepts_marketing: input.accepts_marketing,
            tags: normalise_tags(input.tags),
            note: input.note,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn apply_update(&mut self, update: UpdateCustomer) {
        if let Some(email) = update.email {
            self.email = normalise_email(&email);
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            self.phone = phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        }
        if let Some(accepts_marketing) = update.accepts_marketing {
            self.accepts_marketing = accepts_marketing;
        }
        if let Some(tags) = update.tags {
            self.tags = normalise_tags(tags);
        }
        if let Some(note) = update.note {
            self.note = note;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomer {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: String,
    #[validate(length(min = 3, max = 32))]
    pub phone: Option<String>,
    #[serde(default)]
    pub accepts_marketing: bool,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tags: Vec<String>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomer {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    /// `null` clears the phone number
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    pub accepts_marketing: Option<bool>,
    #[validate(length(max = 50))]
    pub tags: Option<Vec<String>>,
    /// `null` clears the note
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CustomerFilter {
    /// Substring of first name, last name or email
    pub search: Option<String>,
    pub tag: Option<String>,
    pub accepts_marketing: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for CustomerFilter {
    fn default() -> Self {
        Self {
            search: None,
            tag: None,
            accepts_marketing: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl CustomerFilter {
    pub fn unbounded(self) -> Self {
        Self {
            limit: usize::MAX,
            offset: 0,
            ..self
        }
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            let hit = [&customer.email, &customer.first_name, &customer.last_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(ref tag) = self.tag
            && !customer.tags.contains(&tag.trim().to_lowercase())
        {
            return false;
        }
        if let Some(accepts) = self.accepts_marketing
            && customer.accepts_marketing != accepts
        {
            return false;
        }
        true
    }
}

// Contact messages

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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "contact_status")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ContactStatus {
    #[default]
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "read")]
    Read,
    #[sea_orm(string_value = "replied")]
    Replied,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactMessage {
    pub fn new(input: SubmitContact) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            email: normalise_email(&input.email),
            subject: input.subject.unwrap_or_default().trim().to_string(),
            body: input.body.trim().to_string(),
            status: ContactStatus::New,
            created_at: now,
            updated_at: now,
        }
    }
}

fn validate_body(body: &str) -> Result<(), validator::ValidationError> {
    if body.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("body must not be blank".into()));
    }
    Ok(())
}

/// Storefront contact form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitContact {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 5000), custom(function = "validate_body"))]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetContactStatus {
    pub status: ContactStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ContactFilter {
    pub status: Option<ContactStatus>,
    /// Substring of name, email, subject or body
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for ContactFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ContactFilter {
    pub fn matches(&self, message: &ContactMessage) -> bool {
        if let Some(status) = self.status
            && message.status != status
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            let hit = [&message.name, &message.email, &message.subject, &message.body]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    /// Messages still in `new`
    pub unread: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(email: &str) -> CreateCustomer {
        CreateCustomer {
            email: email.into(),
            first_name: " Ana ".into(),
            last_name: "Lima".into(),
            phone: Some("  ".into()),
            accepts_marketing: true,
            tags: vec!["VIP".into(), " vip ".into(), "".into(), "wholesale".into()],
            note: None,
        }
    }

    #[test]
    fn test_new_customer_is_normalised() {
        let customer = Customer::new(create(" Ana@Shop.TEST "));
        assert_eq!(customer.email, "ana@shop.test");
        assert_eq!(customer.first_name, "Ana");
        assert_eq!(customer.phone, None);
        assert_eq!(customer.tags, vec!["vip", "wholesale"]);
        assert_eq!(customer.full_name(), "Ana Lima");
    }

    #[test]
    fn test_update_clears_phone_with_null() {
        let mut customer = Customer::new(create("ana@shop.test"));
        customer.phone = Some("+351 912".into());
        let update: UpdateCustomer = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        customer.apply_update(update);
        assert_eq!(customer.phone, None);
    }

    #[test]
    fn test_filter_search_spans_name_and_email() {
        let customer = Customer::new(create("ana@shop.test"));
        let by_name = CustomerFilter {
            search: Some("lim".into()),
            ..Default::default()
        };
        let by_tag = CustomerFilter {
            tag: Some("VIP".into()),
            ..Default::default()
        };
        let miss = CustomerFilter {
            search: Some("bo".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&customer));
        assert!(by_tag.matches(&customer));
        assert!(!miss.matches(&customer));
    }

    #[test]
    fn test_contact_body_rules() {
        let ok = SubmitContact {
            name: "Ana".into(),
            email: "ana@shop.test".into(),
            subject: None,
            body: "Where is my parcel?".into(),
        };
        assert!(ok.validate().is_ok());

        let blank = SubmitContact {
            body: "   ".into(),
            ..ok.clone()
        };
        assert!(blank.validate().is_err());

        let long = SubmitContact {
            body: "x".repeat(5001),
            ..ok.clone()
        };
        assert!(long.validate().is_err());

        let bad_email = SubmitContact {
            email: "not-an-email".into(),
            ..ok
        };
        assert!(bad_email.validate().is_err());
    }
}
