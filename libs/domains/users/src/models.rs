use axum_helpers::TokenSubject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Staff roles
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    /// Full access, including staff management
    Admin,
    /// Catalog, orders, content and discounts
    Manager,
    /// Customers, contact messages and support threads
    #[default]
    Support,
}

/// Staff account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    /// Lowercased, unique
    pub email: String,
    pub name: String,
    /// Argon2id PHC string, never serialised
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// `email` must already be normalised and `password_hash` computed
    pub fn new(email: String, name: String, password_hash: String, roles: Vec<Role>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email,
            name,
            password_hash,
            roles: normalise_roles(roles),
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Apply updates; the password must already be hashed
    pub fn apply_update(&mut self, update: UpdateUser, new_password_hash: Option<String>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(roles) = update.roles {
            self.roles = normalise_roles(roles);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(hash) = new_password_hash {
            self.password_hash = hash;
        }
        self.updated_at = Utc::now();
    }

    /// Claims carried by this user's tokens
    pub fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            roles: self.roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Deduplicates while keeping order; an empty set becomes `[support]`
fn normalise_roles(roles: Vec<Role>) -> Vec<Role> {
    let mut out = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(&role) {
            out.push(role);
        }
    }
    if out.is_empty() {
        out.push(Role::Support);
    }
    out
}

/// DTO for creating a staff account
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// DTO for updating a staff account
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

/// Query filters for listing users
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct UserFilter {
    /// Substring of name or email
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            is_active: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !user.email.contains(&needle) && !user.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(role) = self.role
            && !user.has_role(role)
        {
            return false;
        }
        if let Some(is_active) = self.is_active
            && user.is_active != is_active
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Returned by `POST /auth/login`; both tokens are also set as HttpOnly cookies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Returned by `POST /auth/refresh`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Optional body of refresh/logout; the `refresh_token` cookie is used otherwise
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_default_to_support_and_dedupe() {
        let user = User::new("a@shop.test".into(), "A".into(), "hash".into(), vec![]);
        assert_eq!(user.roles, vec![Role::Support]);

        let user = User::new(
            "b@shop.test".into(),
            "B".into(),
            "hash".into(),
            vec![Role::Admin, Role::Manager, Role::Admin],
        );
        assert_eq!(user.roles, vec![Role::Admin, Role::Manager]);
    }

    #[test]
    fn test_password_hash_is_not_serialised() {
        let user = User::new("a@shop.test".into(), "A".into(), "$argon2id$secret".into(), vec![]);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Manager.to_string(), "manager");
    }

    #[test]
    fn test_filter_matches_search_and_role() {
        let user = User::new("ops@shop.test".into(), "Olga".into(), "h".into(), vec![Role::Manager]);
        let filter = UserFilter {
            search: Some("OLG".into()),
            role: Some(Role::Manager),
            ..Default::default()
        };
        assert!(filter.matches(&user));

        let filter = UserFilter {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert!(!filter.matches(&user));
    }

    #[test]
    fn test_token_subject_carries_role_names() {
        let user = User::new("a@shop.test".into(), "A".into(), "h".into(), vec![Role::Admin]);
        let subject = user.token_subject();
        assert_eq!(subject.roles, vec!["admin".to_string()]);
        assert_eq!(subject.user_id, user.id);
    }
}
