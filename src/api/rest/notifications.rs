//! Notification and activity feed endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{CountResponse, SuccessResponse};
use crate::auth::CurrentUser;
use crate::data::{ActivityWithUser, Notification};
use crate::error::{AppError, OrFail};

const NOTIFICATION_LIMIT: i64 = 50;
const ACTIVITY_LIMIT: i64 = 50;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = state
        .db
        .get_notifications(user.id(), NOTIFICATION_LIMIT)
        .await
        .or_fail("Failed to fetch notifications")?;
    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CountResponse>, AppError> {
    let count = state
        .db
        .count_unread_notifications(user.id())
        .await
        .or_fail("Failed to fetch unread count")?;
    Ok(Json(CountResponse { count }))
}

/// PUT /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let updated = state
        .db
        .mark_notification_read(&id, user.id())
        .await
        .or_fail("Failed to update notification")?;
    if !updated {
        return Err(AppError::NotFound);
    }
    Ok(Json(SuccessResponse::ok()))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .mark_all_notifications_read(user.id())
        .await
        .or_fail("Failed to update notifications")?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/activities
pub async fn list_activities(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<ActivityWithUser>>, AppError> {
    let activities = state
        .db
        .get_activities(ACTIVITY_LIMIT)
        .await
        .or_fail("Failed to fetch activities")?;
    Ok(Json(activities))
}
