//! Messaging service
//!
//! Direct messages between two users. Viewing a conversation marks the
//! counterpart's messages to the viewer as read.

use std::sync::Arc;

use super::FeedService;
use crate::data::{
    ConversationSummary, Database, Message, MessageWithUsers, NewNotification, NotificationType,
    UserSummary,
};
use crate::error::AppError;
use crate::metrics::MESSAGES_SENT_TOTAL;

/// Preview length used in message notifications
const PREVIEW_CHARS: usize = 80;

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Messaging service
pub struct MessagingService {
    db: Arc<Database>,
    feed: Arc<FeedService>,
}

impl MessagingService {
    pub fn new(db: Arc<Database>, feed: Arc<FeedService>) -> Self {
        Self { db, feed }
    }

    /// Send a message and notify the receiver.
    ///
    /// # Errors
    /// `Validation` for empty content or a message to yourself, `NotFound`
    /// when the receiver does not exist.
    pub async fn send(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        photo_url: Option<&str>,
    ) -> Result<Message, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::validation("Message content is required"));
        }
        if sender_id == receiver_id {
            return Err(AppError::validation("Cannot message yourself"));
        }

        let receiver = self.db.get_user(receiver_id).await?.ok_or(AppError::NotFound)?;
        let sender = self.db.get_user(sender_id).await?.ok_or(AppError::NotFound)?;

        let message = self
            .db
            .create_message(sender_id, &receiver.id, content, photo_url)
            .await?;
        MESSAGES_SENT_TOTAL.inc();
        tracing::debug!(message_id = %message.id, sender_id = %sender_id, "Message sent");

        self.feed
            .notify(NewNotification {
                user_id: receiver.id.clone(),
                notification_type: NotificationType::Message,
                title: format!("New message from {}", sender.public_name()),
                message: preview(content),
                related_id: Some(message.id.clone()),
                related_type: Some("message"),
            })
            .await;

        Ok(message)
    }

    /// The full thread with `other_id`, oldest first.
    ///
    /// Unread messages from `other_id` are marked read after the fetch, so
    /// the returned rows show their state before viewing.
    pub async fn conversation(
        &self,
        caller_id: &str,
        other_id: &str,
    ) -> Result<Vec<MessageWithUsers>, AppError> {
        let messages = self.db.get_conversation(caller_id, other_id).await?;
        let users = self
            .db
            .get_users_by_ids(&[caller_id.to_string(), other_id.to_string()])
            .await?;

        let thread = messages
            .into_iter()
            .filter_map(|message| {
                let sender = UserSummary::from(users.get(&message.sender_id)?);
                let receiver = UserSummary::from(users.get(&message.receiver_id)?);
                Some(MessageWithUsers {
                    message,
                    sender,
                    receiver,
                })
            })
            .collect();

        let marked = self.db.mark_messages_read(caller_id, other_id).await?;
        if marked > 0 {
            tracing::debug!(
                caller_id = %caller_id,
                other_id = %other_id,
                marked,
                "Messages marked read"
            );
        }

        Ok(thread)
    }

    /// One entry per counterpart with the latest message, newest first.
    pub async fn conversations(
        &self,
        caller_id: &str,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let latest = self.db.get_latest_messages_per_counterpart(caller_id).await?;
        let unread = self.db.get_unread_counts_by_sender(caller_id).await?;

        let counterpart_ids: Vec<String> = latest
            .iter()
            .map(|m| counterpart(m, caller_id).to_string())
            .collect();
        let users = self.db.get_users_by_ids(&counterpart_ids).await?;

        Ok(latest
            .into_iter()
            .filter_map(|last_message| {
                let other_id = counterpart(&last_message, caller_id);
                let user = UserSummary::from(users.get(other_id)?);
                let unread_count = unread.get(other_id).copied().unwrap_or(0);
                Some(ConversationSummary {
                    user,
                    last_message,
                    unread_count,
                })
            })
            .collect())
    }

    /// Unread messages addressed to the caller, optionally from one sender.
    pub async fn unread_count(&self, caller_id: &str, from: Option<&str>) -> Result<i64, AppError> {
        self.db.count_unread_messages(caller_id, from).await
    }
}

fn counterpart<'a>(message: &'a Message, user_id: &str) -> &'a str {
    if message.sender_id == user_id {
        &message.receiver_id
    } else {
        &message.sender_id
    }
}
