//! Hobby group endpoints
//!
//! Joining checks capacity and inserts the membership in one
//! write transaction, so `currentMembers` never exceeds
//! `maxMembers`.

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::ensure_joined;
use crate::AppState;
use crate::api::dto::{
    CreateHobbyGroupRequest, SuccessResponse, optional_text, parse_optional, required_text,
};
use crate::auth::CurrentUser;
use crate::data::{
    ActivityType, HobbyGroup, HobbyGroupDetails, HobbyGroupMemberWithUser, NewActivity,
    NewHobbyGroup, NewNotification, NotificationType, TargetAgeGroup,
};
use crate::error::{AppError, OrFail};
use crate::metrics::MEMBERSHIP_CHANGES_TOTAL;

const DEFAULT_MAX_MEMBERS: i64 = 10;

/// GET /api/hobby-groups
pub async fn list_hobby_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<HobbyGroupDetails>>, AppError> {
    let groups = state
        .db
        .get_hobby_groups(None)
        .await
        .or_fail("Failed to fetch hobby groups")?;
    Ok(Json(groups))
}

/// GET /api/hobby-groups/hobby/:hobbyId
pub async fn hobby_groups_by_hobby(
    State(state): State<AppState>,
    Path(hobby_id): Path<String>,
) -> Result<Json<Vec<HobbyGroupDetails>>, AppError> {
    let groups = state
        .db
        .get_hobby_groups(Some(&hobby_id))
        .await
        .or_fail("Failed to fetch hobby groups")?;
    Ok(Json(groups))
}

/// GET /api/my-hobby-groups
pub async fn my_hobby_groups(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<HobbyGroupDetails>>, AppError> {
    let groups = state
        .db
        .get_hobby_groups_for_member(user.id())
        .await
        .or_fail("Failed to fetch user hobby groups")?;
    Ok(Json(groups))
}

/// POST /api/hobby-groups
///
/// The creator joins as `organizer` and counts toward `maxMembers`.
pub async fn create_hobby_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateHobbyGroupRequest>,
) -> Result<Json<HobbyGroup>, AppError> {
    let hobby_id = required_text(body.hobby_id, "Hobby ID is required")?;
    let name = required_text(body.name, "Group name is required")?;
    let max_members = body.max_members.unwrap_or(DEFAULT_MAX_MEMBERS);
    if max_members < 2 {
        return Err(AppError::validation("Max members must be at least 2"));
    }
    let target_age_group = parse_optional::<TargetAgeGroup>(body.target_age_group.as_deref())?;

    let hobby = state
        .db
        .get_hobby(&hobby_id)
        .await
        .or_fail("Failed to create hobby group")?
        .ok_or(AppError::NotFound)?;

    let group = state
        .db
        .create_hobby_group(&NewHobbyGroup {
            creator_id: user.id().to_string(),
            hobby_id: hobby.id.clone(),
            name,
            description: optional_text(body.description),
            location: body.location,
            max_members,
            target_age_group,
            meeting_schedule: body.meeting_schedule,
            image_url: optional_text(body.image_url),
        })
        .await
        .or_fail("Failed to create hobby group")?;

    state
        .feed
        .record(NewActivity {
            user_id: user.id().to_string(),
            activity_type: ActivityType::HobbyGroup,
            title: format!("Started {} group {}", hobby.name, group.name),
            description: group.description.clone(),
            metadata: Some(serde_json::json!({ "hobbyGroupId": group.id, "hobbyId": hobby.id })),
            is_public: true,
        })
        .await;

    tracing::info!(group_id = %group.id, hobby_id = %hobby.id, "Hobby group created");
    Ok(Json(group))
}

/// POST /api/hobby-groups/:groupId/join
pub async fn join_hobby_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<HobbyGroup>, AppError> {
    let outcome = state
        .db
        .join_hobby_group(&group_id, user.id())
        .await
        .or_fail("Failed to join hobby group")?;
    ensure_joined(outcome, "Group is full", "Already a member of this group")?;
    MEMBERSHIP_CHANGES_TOTAL
        .with_label_values(&["hobby_group", "join"])
        .inc();

    let group = state
        .db
        .get_hobby_group(&group_id)
        .await
        .or_fail("Failed to join hobby group")?
        .ok_or(AppError::NotFound)?;

    if group.creator_id != user.id() {
        state
            .feed
            .notify(NewNotification {
                user_id: group.creator_id.clone(),
                notification_type: NotificationType::HobbyGroupJoined,
                title: "New hobby group member".to_string(),
                message: format!(
                    "Someone joined {} ({}/{})",
                    group.name, group.current_members, group.max_members
                ),
                related_id: Some(group.id.clone()),
                related_type: Some("hobby_group"),
            })
            .await;
    }

    Ok(Json(group))
}

/// DELETE /api/hobby-groups/:groupId/leave
pub async fn leave_hobby_group(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state
        .db
        .leave_hobby_group(&group_id, user.id())
        .await
        .or_fail("Failed to leave hobby group")?
    {
        MEMBERSHIP_CHANGES_TOTAL
            .with_label_values(&["hobby_group", "leave"])
            .inc();
    }
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/hobby-groups/:groupId/members
pub async fn hobby_group_members(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<HobbyGroupMemberWithUser>>, AppError> {
    let members = state
        .db
        .get_hobby_group_members(&group_id)
        .await
        .or_fail("Failed to fetch group members")?;
    Ok(Json(members))
}
