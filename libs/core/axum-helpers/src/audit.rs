//! Audit trail for security-relevant console actions.
//!
//! Events go to the `audit` tracing target so they can be routed separately.
//!
//! ```ignore
//! AuditEvent::by(&claims, "product.delete", format!("product:{id}"))
//!     .from_headers(&headers)
//!     .log();
//!
//! AuditEvent::new(None, "auth.login", Some(format!("email:{email}")), AuditOutcome::Denied)
//!     .from_headers(&headers)
//!     .with_details(json!({ "reason": "bad_credentials" }))
//!     .log();
//! ```

use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::JwtClaims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Acting staff user, `None` for anonymous requests
    pub user_id: Option<String>,
    /// Dotted action name, e.g. `order.transition`
    pub action: String,
    /// `kind:id`, e.g. `order:0193...`
    pub resource: Option<String>,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        user_id: Option<String>,
        action: impl Into<String>,
        resource: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            resource,
            outcome,
            ip_address: None,
            user_agent: None,
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Successful action by an authenticated user
    pub fn by(claims: &JwtClaims, action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(
            Some(claims.sub.clone()),
            action,
            Some(resource.into()),
            AuditOutcome::Success,
        )
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Client IP and user agent from the request headers
    pub fn from_headers(self, headers: &HeaderMap) -> Self {
        self.with_ip(extract_ip_from_headers(headers))
            .with_user_agent(extract_user_agent(headers))
    }

    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    pub fn log(self) {
        tracing::info!(
            target: "audit",
            user_id = self.user_id,
            action = %self.action,
            resource = self.resource,
            outcome = ?self.outcome,
            ip = self.ip_address,
            user_agent = self.user_agent,
            details = ?self.details,
            "{}",
            serde_json::to_string(&self).unwrap_or_else(|_| self.action.clone())
        );
    }
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`
pub fn extract_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_ip_from_headers(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_ip_from_headers(&headers).as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn test_event_serializes_outcome_lowercase() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));

        let event = AuditEvent::new(None, "auth.login", None, AuditOutcome::Denied)
            .from_headers(&headers)
            .with_details(serde_json::json!({ "reason": "bad_credentials" }));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["outcome"], "denied");
        assert_eq!(json["user_agent"], "curl/8");
        assert_eq!(json["details"]["reason"], "bad_credentials");
    }
}
