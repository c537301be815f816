//! Notification service: user-facing notices on key transitions.

use std::sync::Arc;

use crate::domain::{Clock, Notification, NotificationId, NotificationKind};
use crate::error::HubError;
use crate::persistence::Store;

/// Creates and serves notifications.
///
/// [`NotificationService::notify`] is fire-and-forget: a failed insert is
/// logged and never reaches the caller of the triggering operation.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    /// Creates a new `NotificationService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stores a new unread notification for `user_id`.
    pub async fn notify(
        &self,
        user_id: uuid::Uuid,
        title: &str,
        message: &str,
        kind: NotificationKind,
        related_id: Option<uuid::Uuid>,
    ) {
        let notification = Notification {
            id: NotificationId::new(),
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            kind,
            related_id,
            read: false,
            created_at: self.clock.now(),
        };
        if let Err(e) = self.store.insert_notification(&notification).await {
            tracing::warn!(%user_id, error = %e, "failed to create notification");
        }
    }

    /// Lists a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] on persistence failure.
    pub async fn list(&self, user_id: uuid::Uuid) -> Result<Vec<Notification>, HubError> {
        Ok(self.store.list_notifications(user_id).await?)
    }

    /// Number of unread notifications for a user.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] on persistence failure.
    pub async fn unread_count(&self, user_id: uuid::Uuid) -> Result<usize, HubError> {
        let all = self.store.list_notifications(user_id).await?;
        Ok(all.iter().filter(|n| !n.read).count())
    }

    /// Marks one notification read.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] if the notification does not exist.
    pub async fn mark_read(&self, id: NotificationId) -> Result<(), HubError> {
        if self.store.mark_notification_read(id).await? {
            Ok(())
        } else {
            Err(HubError::not_found("notification", id))
        }
    }

    /// Marks every notification of a user read, returning how many changed.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] on persistence failure.
    pub async fn mark_all_read(&self, user_id: uuid::Uuid) -> Result<u64, HubError> {
        Ok(self.store.mark_all_notifications_read(user_id).await?)
    }
}
