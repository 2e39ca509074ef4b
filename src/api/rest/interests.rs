//! Interest catalog, user interests and interest-based discovery

use axum::{
    extract::{Path, Query, RawQuery, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{
    AddUserInterestRequest, CreateInterestRequest, LimitParams, SuccessResponse, optional_text,
    query_values, required_text,
};
use crate::auth::CurrentUser;
use crate::data::{ActivityType, Interest, InterestGroup, NewActivity, NewInterest};
use crate::error::{AppError, OrFail};
use crate::service::{InterestMatch, InterestSearchHit};

/// GET /api/interests
pub async fn list_interests(
    State(state): State<AppState>,
) -> Result<Json<Vec<Interest>>, AppError> {
    let interests = state
        .db
        .get_all_interests()
        .await
        .or_fail("Failed to fetch interests")?;
    Ok(Json(interests))
}

/// POST /api/interests
pub async fn create_interest(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<CreateInterestRequest>,
) -> Result<Json<Interest>, AppError> {
    let new = NewInterest {
        name: required_text(body.name, "Interest name is required")?,
        description: optional_text(body.description),
        icon: optional_text(body.icon),
        color: optional_text(body.color),
    };

    let interest = state
        .db
        .create_interest(&new)
        .await
        .or_fail("Failed to create interest")?
        .ok_or_else(|| AppError::validation("Interest already exists"))?;

    tracing::info!(interest_id = %interest.id, name = %interest.name, "Interest created");
    Ok(Json(interest))
}

/// POST /api/user-interests
pub async fn add_user_interest(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<AddUserInterestRequest>,
) -> Result<Json<Interest>, AppError> {
    let interest_id = required_text(body.interest_id, "Interest ID is required")?;
    let interest = state
        .db
        .get_interest(&interest_id)
        .await
        .or_fail("Failed to add interest")?
        .ok_or(AppError::NotFound)?;

    let added = state
        .db
        .add_user_interest(user.id(), &interest.id)
        .await
        .or_fail("Failed to add interest")?;

    if added {
        state
            .feed
            .record(NewActivity {
                user_id: user.id().to_string(),
                activity_type: ActivityType::Interest,
                title: format!("Added interest {}", interest.name),
                description: None,
                metadata: Some(serde_json::json!({ "interestId": interest.id })),
                is_public: true,
            })
            .await;
    }

    let interest = state
        .db
        .get_interest(&interest.id)
        .await
        .or_fail("Failed to add interest")?
        .ok_or(AppError::NotFound)?;
    Ok(Json(interest))
}

/// DELETE /api/user-interests/:interestId
pub async fn remove_user_interest(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(interest_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .remove_user_interest(user.id(), &interest_id)
        .await
        .or_fail("Failed to remove interest")?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/interest-groups
pub async fn interest_groups(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<InterestGroup>>, AppError> {
    let groups = state
        .db
        .get_interest_groups()
        .await
        .or_fail("Failed to fetch interest groups")?;
    Ok(Json(groups))
}

/// GET /api/discover
pub async fn discover(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<InterestMatch>>, AppError> {
    let matches = state
        .discovery
        .users_with_shared_interests(user.id(), params.parsed())
        .await
        .or_fail("Failed to discover users")?;
    Ok(Json(matches))
}

/// GET /api/search-users?interests=a&interests=b
pub async fn search_users(
    State(state): State<AppState>,
    user: CurrentUser,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<InterestSearchHit>>, AppError> {
    let interest_ids = query_values(query.as_deref(), "interests");
    if interest_ids.is_empty() {
        return Err(AppError::validation("Interest IDs required"));
    }

    let hits = state
        .discovery
        .search_users_by_interests(&interest_ids, user.id())
        .await
        .or_fail("Failed to search users")?;
    Ok(Json(hits))
}
