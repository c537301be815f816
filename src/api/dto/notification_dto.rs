//! Notification DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Notification, NotificationKind};

/// Notification representation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationDto {
    /// Notification identifier.
    pub id: uuid::Uuid,
    /// Recipient.
    pub user_id: uuid::Uuid,
    /// Short title.
    pub title: String,
    /// Body.
    pub message: String,
    /// Kind.
    pub kind: NotificationKind,
    /// Related entity (usually an event).
    pub related_id: Option<uuid::Uuid>,
    /// Whether the recipient has read it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.into(),
            user_id: n.user_id,
            title: n.title,
            message: n.message,
            kind: n.kind,
            related_id: n.related_id,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

/// Response body for `GET /users/{id}/notifications/unread-count`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    /// Unread notifications.
    pub unread: usize,
}

/// Response body for `POST /users/{id}/notifications/read-all`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Notifications flipped to read.
    pub updated: u64,
}
