//! Wire types for the support backend.
//!
//! Field names follow the backend's camelCase JSON. Unknown fields are ignored
//! so backend additions never break the console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// `GET /users/me`. Roles come from the token, not from this body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default = "default_theme")]
    pub selected_theme: String,
}

fn default_theme() -> String {
    "light".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageSource {
    Operator,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub source: MessageSource,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub operator_sender: Option<OperatorRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// `"<name>;<phone digits>"`, phone optional.
    pub external_participant_identifier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message_count: Option<u64>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
}

impl Conversation {
    /// Display name part of the participant identifier.
    pub fn participant_name(&self) -> &str {
        self.external_participant_identifier
            .split(';')
            .next()
            .unwrap_or_default()
    }

    /// Raw phone digits, if the identifier carries any.
    pub fn participant_phone(&self) -> Option<&str> {
        self.external_participant_identifier
            .split(';')
            .nth(1)
            .filter(|p| !p.is_empty())
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("Ativa")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardMetrics {
    pub total_conversations: u64,
    pub conversations_trend: f64,
    pub messages_today: u64,
    pub messages_trend: f64,
    /// Minutes between a customer message and the operator reply.
    pub average_response_time: f64,
    pub response_time_trend: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: String,
    #[serde(default)]
    pub conversations: u64,
    #[serde(default)]
    pub messages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub role: RoleName,
}

/// Roster entry from `GET /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default = "default_theme", rename = "selected_theme")]
    pub selected_theme: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_roles: Vec<UserRole>,
}

impl UserRecord {
    pub fn role_names(&self) -> Vec<&str> {
        self.user_roles.iter().map(|ur| ur.role.name.as_str()).collect()
    }

    pub fn primary_role(&self) -> &str {
        self.user_roles
            .first()
            .map(|ur| ur.role.name.as_str())
            .unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub role: String,
}

/// `PATCH /users/{id}` body. Only changed fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.role.is_none()
    }

    /// Drop fields that would not change `current`.
    pub fn against(mut self, current: &UserRecord) -> Self {
        if self.email.as_deref() == Some(current.email.as_str()) {
            self.email = None;
        }
        if self.name.as_deref() == Some(current.name.as_str()) {
            self.name = None;
        }
        if self.role.as_deref() == current.user_roles.first().map(|ur| ur.role.name.as_str()) {
            self.role = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_splits_participant_identifier() {
        let conv: Conversation = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "externalParticipantIdentifier": "Maria Silva;5511987654321",
            "createdAt": "2025-01-10T12:00:00Z",
            "updatedAt": "2025-01-10T13:00:00Z"
        }))
        .unwrap();
        assert_eq!(conv.participant_name(), "Maria Silva");
        assert_eq!(conv.participant_phone(), Some("5511987654321"));
        assert_eq!(conv.status_label(), "Ativa");
    }

    #[test]
    fn message_source_uses_uppercase_wire_names() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "content": "Olá",
            "source": "OPERATOR",
            "createdAt": "2025-01-10T12:00:00Z",
            "operatorSender": { "id": "u1", "name": "Ana", "email": "ana@example.com" }
        }))
        .unwrap();
        assert_eq!(msg.source, MessageSource::Operator);
        assert_eq!(msg.operator_sender.unwrap().name, "Ana");
    }

    #[test]
    fn metrics_tolerate_missing_fields() {
        let m: DashboardMetrics =
            serde_json::from_value(serde_json::json!({ "totalConversations": 12 })).unwrap();
        assert_eq!(m.total_conversations, 12);
        assert_eq!(m.messages_today, 0);
    }

    #[test]
    fn user_patch_keeps_only_changes() {
        let current: UserRecord = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "ana@example.com",
            "name": "Ana",
            "selected_theme": "dark",
            "userRoles": [{ "role": { "name": "support" } }]
        }))
        .unwrap();
        assert_eq!(current.primary_role(), "support");

        let patch = UserPatch {
            email: Some("ana@example.com".into()),
            name: Some("Ana Paula".into()),
            role: Some("support".into()),
        }
        .against(&current);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "name": "Ana Paula" })
        );
    }
}
