//! Direct message endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{CountResponse, SendMessageRequest, UnreadParams, optional_text};
use crate::auth::CurrentUser;
use crate::data::{ConversationSummary, Message, MessageWithUsers};
use crate::error::{AppError, OrFail};

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    let conversations = state
        .messaging
        .conversations(user.id())
        .await
        .or_fail("Failed to fetch conversations")?;
    Ok(Json(conversations))
}

/// GET /api/conversations/:userId
///
/// Marks the other user's messages to the caller as read.
pub async fn get_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(other_id): Path<String>,
) -> Result<Json<Vec<MessageWithUsers>>, AppError> {
    let thread = state
        .messaging
        .conversation(user.id(), &other_id)
        .await
        .or_fail("Failed to fetch conversation")?;
    Ok(Json(thread))
}

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let receiver_id = body
        .receiver_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::validation("Receiver ID is required"))?;
    let content = body.content.unwrap_or_default();
    let photo_url = optional_text(body.photo_url);

    let message = state
        .messaging
        .send(user.id(), &receiver_id, &content, photo_url.as_deref())
        .await
        .or_fail("Failed to send message")?;
    Ok(Json(message))
}

/// GET /api/messages/unread-count?from=userId
pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<UnreadParams>,
) -> Result<Json<CountResponse>, AppError> {
    let count = state
        .messaging
        .unread_count(user.id(), params.from.as_deref())
        .await
        .or_fail("Failed to fetch unread count")?;
    Ok(Json(CountResponse { count }))
}
