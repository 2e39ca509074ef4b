//! Community group endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::ensure_joined;
use crate::AppState;
use crate::api::dto::{CreateGroupRequest, SuccessResponse, optional_text, required_text};
use crate::auth::CurrentUser;
use crate::data::{
    ActivityType, Group, GroupWithCreator, NewActivity, NewGroup, NewNotification,
    NotificationType,
};
use crate::error::{AppError, OrFail};
use crate::metrics::MEMBERSHIP_CHANGES_TOTAL;

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<GroupWithCreator>>, AppError> {
    let groups = state.db.get_groups().await.or_fail("Failed to fetch groups")?;
    Ok(Json(groups))
}

/// GET /api/my-groups
pub async fn my_groups(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<GroupWithCreator>>, AppError> {
    let groups = state
        .db
        .get_groups_for_member(user.id())
        .await
        .or_fail("Failed to fetch user groups")?;
    Ok(Json(groups))
}

/// POST /api/groups
///
/// The creator joins as `admin`.
pub async fn create_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<Json<Group>, AppError> {
    let new = NewGroup {
        creator_id: user.id().to_string(),
        name: required_text(body.name, "Group name is required")?,
        description: optional_text(body.description),
        is_private: body.is_private,
        image_url: optional_text(body.image_url),
        tags: body.tags,
    };

    let group = state
        .db
        .create_group(&new)
        .await
        .or_fail("Failed to create group")?;

    state
        .feed
        .record(NewActivity {
            user_id: user.id().to_string(),
            activity_type: ActivityType::Group,
            title: format!("Created group {}", group.name),
            description: group.description.clone(),
            metadata: Some(serde_json::json!({ "groupId": group.id })),
            is_public: !group.is_private,
        })
        .await;

    Ok(Json(group))
}

/// POST /api/groups/:groupId/join
pub async fn join_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<Group>, AppError> {
    let outcome = state
        .db
        .join_group(&group_id, user.id())
        .await
        .or_fail("Failed to join group")?;
    ensure_joined(outcome, "Group is full", "Already a member of this group")?;
    MEMBERSHIP_CHANGES_TOTAL
        .with_label_values(&["group", "join"])
        .inc();

    let group = state
        .db
        .get_group(&group_id)
        .await
        .or_fail("Failed to join group")?
        .ok_or(AppError::NotFound)?;

    if group.creator_id != user.id() {
        state
            .feed
            .notify(NewNotification {
                user_id: group.creator_id.clone(),
                notification_type: NotificationType::GroupJoined,
                title: "New group member".to_string(),
                message: format!("Someone joined {}", group.name),
                related_id: Some(group.id.clone()),
                related_type: Some("group"),
            })
            .await;
    }

    Ok(Json(group))
}

/// DELETE /api/groups/:groupId/leave
pub async fn leave_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state
        .db
        .leave_group(&group_id, user.id())
        .await
        .or_fail("Failed to leave group")?
    {
        MEMBERSHIP_CHANGES_TOTAL
            .with_label_values(&["group", "leave"])
            .inc();
    }
    Ok(Json(SuccessResponse::ok()))
}
