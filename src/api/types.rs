use serde::Serialize;

use crate::db::{ActivityLogEntry, AdminKey, Invite, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// The identity bound to the caller's session.
#[derive(Debug, Serialize)]
pub struct SessionUserDto {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub slack_id: Option<String>,
    pub slack_email: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            slack_id: user.slack_id,
            slack_email: user.slack_email,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminKeyDto {
    pub key: String,
    pub name: String,
    pub generated_by: String,
    pub generated_at: String,
}

impl From<AdminKey> for AdminKeyDto {
    fn from(key: AdminKey) -> Self {
        Self {
            key: key.key,
            name: key.name,
            generated_by: key.generated_by,
            generated_at: key.generated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InviteDto {
    pub email: String,
    pub invite_code: String,
    pub invited_by: String,
    pub created_at: String,
    pub is_used: bool,
    pub used_at: Option<String>,
    pub used_by: Option<String>,
}

impl From<Invite> for InviteDto {
    fn from(invite: Invite) -> Self {
        Self {
            email: invite.email,
            invite_code: invite.invite_code,
            invited_by: invite.invited_by,
            created_at: invite.created_at,
            is_used: invite.is_used,
            used_at: invite.used_at,
            used_by: invite.used_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityDto {
    pub id: i64,
    pub username: String,
    pub action: String,
    pub details: Option<String>,
    pub created_at: String,
}

impl From<ActivityLogEntry> for ActivityDto {
    fn from(entry: ActivityLogEntry) -> Self {
        Self {
            id: entry.id,
            username: entry.username,
            action: entry.action,
            details: entry.details,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
