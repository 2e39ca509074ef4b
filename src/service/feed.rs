//! Notification and activity side effects
//!
//! Writes that follow a successful mutation. A failure here is logged and
//! does not undo or fail the mutation that triggered it.

use std::sync::Arc;

use crate::data::{Database, NewActivity, NewNotification};

/// Notification and activity writer
pub struct FeedService {
    db: Arc<Database>,
}

impl FeedService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Notify a user, logging on failure
    pub async fn notify(&self, notification: NewNotification) {
        if let Err(error) = self.db.create_notification(&notification).await {
            tracing::warn!(
                %error,
                user_id = %notification.user_id,
                notification_type = %notification.notification_type,
                "failed to create notification"
            );
        }
    }

    /// Append to the activity feed, logging on failure
    pub async fn record(&self, activity: NewActivity) {
        if let Err(error) = self.db.create_activity(&activity).await {
            tracing::warn!(
                %error,
                user_id = %activity.user_id,
                activity_type = %activity.activity_type,
                "failed to record activity"
            );
        }
    }
}
