//! Event endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::ensure_joined;
use crate::AppState;
use crate::api::dto::{
    CreateEventRequest, JoinEventRequest, SuccessResponse, optional_text, parse_optional,
    required_text,
};
use crate::auth::CurrentUser;
use crate::data::{
    ActivityType, AttendeeStatus, Event, EventAttendee, EventWithCreator, NewActivity, NewEvent,
    NewNotification, NotificationType,
};
use crate::error::{AppError, OrFail};
use crate::metrics::MEMBERSHIP_CHANGES_TOTAL;

/// GET /api/events
pub async fn list_events(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<EventWithCreator>>, AppError> {
    let events = state.db.get_events().await.or_fail("Failed to fetch events")?;
    Ok(Json(events))
}

/// GET /api/my-events
pub async fn my_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<EventWithCreator>>, AppError> {
    let events = state
        .db
        .get_events_by_creator(user.id())
        .await
        .or_fail("Failed to fetch user events")?;
    Ok(Json(events))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let title = required_text(body.title, "Event title is required")?;
    let start_date = body
        .start_date
        .ok_or_else(|| AppError::validation("Start date is required"))?;
    if body.end_date.is_some_and(|end| end < start_date) {
        return Err(AppError::validation("End date must not be before start date"));
    }
    if body.max_attendees.is_some_and(|max| max < 1) {
        return Err(AppError::validation("Max attendees must be at least 1"));
    }

    let new = NewEvent {
        creator_id: user.id().to_string(),
        title,
        description: optional_text(body.description),
        location: optional_text(body.location),
        is_virtual: body.is_virtual,
        start_date,
        end_date: body.end_date,
        max_attendees: body.max_attendees,
        image_url: optional_text(body.image_url),
        tags: body.tags,
    };

    let event = state
        .db
        .create_event(&new)
        .await
        .or_fail("Failed to create event")?;

    state
        .feed
        .record(NewActivity {
            user_id: user.id().to_string(),
            activity_type: ActivityType::Event,
            title: format!("Created event {}", event.title),
            description: event.description.clone(),
            metadata: Some(serde_json::json!({ "eventId": event.id })),
            is_public: true,
        })
        .await;

    tracing::info!(event_id = %event.id, creator_id = %user.id(), "Event created");
    Ok(Json(event))
}

/// POST /api/events/:eventId/join
///
/// The body is optional; the status defaults to `going`.
pub async fn join_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<String>,
    body: Option<Json<JoinEventRequest>>,
) -> Result<Json<EventAttendee>, AppError> {
    let Json(body) = body.unwrap_or_default();
    let status = parse_optional::<AttendeeStatus>(body.status.as_deref())?
        .unwrap_or(AttendeeStatus::Going);

    let outcome = state
        .db
        .join_event(&event_id, user.id(), status)
        .await
        .or_fail("Failed to join event")?;
    ensure_joined(outcome, "Event is full", "Already attending this event")?;
    MEMBERSHIP_CHANGES_TOTAL
        .with_label_values(&["event", "join"])
        .inc();

    if let Some(event) = state.db.get_event(&event_id).await.or_fail("Failed to join event")? {
        if event.creator_id != user.id() && status == AttendeeStatus::Going {
            state
                .feed
                .notify(NewNotification {
                    user_id: event.creator_id.clone(),
                    notification_type: NotificationType::EventJoined,
                    title: "New attendee".to_string(),
                    message: format!("Someone is going to {}", event.title),
                    related_id: Some(event.id.clone()),
                    related_type: Some("event"),
                })
                .await;
        }
    }

    let attendee = state
        .db
        .get_event_attendee(&event_id, user.id())
        .await
        .or_fail("Failed to join event")?
        .ok_or(AppError::NotFound)?;
    Ok(Json(attendee))
}

/// DELETE /api/events/:eventId/leave
pub async fn leave_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state
        .db
        .leave_event(&event_id, user.id())
        .await
        .or_fail("Failed to leave event")?
    {
        MEMBERSHIP_CHANGES_TOTAL
            .with_label_values(&["event", "leave"])
            .inc();
    }
    Ok(Json(SuccessResponse::ok()))
}
