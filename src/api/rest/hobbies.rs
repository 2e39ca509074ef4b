//! Hobby catalog, user hobbies and hobby-partner discovery

use axum::{
    extract::{Path, Query, RawQuery, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{
    AddUserHobbyRequest, CreateHobbyRequest, LimitParams, SuccessResponse, optional_text,
    parse_optional, query_values, required_text,
};
use crate::auth::CurrentUser;
use crate::data::{
    DifficultyLevel, ExperienceLevel, Hobby, HobbyWithUserDetails, NewHobby, NewUserHobby,
    UserHobby,
};
use crate::error::{AppError, OrFail};
use crate::service::{HobbyMatch, HobbySearchHit};

/// GET /api/hobbies
pub async fn list_hobbies(State(state): State<AppState>) -> Result<Json<Vec<Hobby>>, AppError> {
    let hobbies = state
        .db
        .get_all_hobbies()
        .await
        .or_fail("Failed to fetch hobbies")?;
    Ok(Json(hobbies))
}

/// POST /api/hobbies
pub async fn create_hobby(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<CreateHobbyRequest>,
) -> Result<Json<Hobby>, AppError> {
    let new = NewHobby {
        name: required_text(body.name, "Hobby name is required")?,
        description: optional_text(body.description),
        category: required_text(body.category, "Hobby category is required")?,
        icon: optional_text(body.icon),
        color: optional_text(body.color),
        is_elderly_friendly: body.is_elderly_friendly,
        difficulty_level: parse_optional::<DifficultyLevel>(body.difficulty_level.as_deref())?
            .unwrap_or(DifficultyLevel::Easy),
    };

    let hobby = state
        .db
        .create_hobby(&new)
        .await
        .or_fail("Failed to create hobby")?
        .ok_or_else(|| AppError::validation("Hobby already exists"))?;

    tracing::info!(hobby_id = %hobby.id, name = %hobby.name, "Hobby created");
    Ok(Json(hobby))
}

/// GET /api/my-hobbies
pub async fn my_hobbies(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<HobbyWithUserDetails>>, AppError> {
    let hobbies = state
        .db
        .get_hobbies_by_user(user.id())
        .await
        .or_fail("Failed to fetch user hobbies")?;
    Ok(Json(hobbies))
}

/// POST /api/user-hobbies
///
/// Re-adding a hobby replaces the stored experience level, partner flag
/// and schedule.
pub async fn add_user_hobby(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<AddUserHobbyRequest>,
) -> Result<Json<UserHobby>, AppError> {
    let hobby_id = required_text(body.hobby_id, "Hobby ID is required")?;
    let details = NewUserHobby {
        experience_level: parse_optional::<ExperienceLevel>(body.experience_level.as_deref())?
            .unwrap_or(ExperienceLevel::Beginner),
        is_looking_for_partners: body.is_looking_for_partners.unwrap_or(true),
        available_schedule: body.available_schedule,
    };

    state
        .db
        .get_hobby(&hobby_id)
        .await
        .or_fail("Failed to add hobby")?
        .ok_or(AppError::NotFound)?;

    let user_hobby = state
        .db
        .add_user_hobby(user.id(), &hobby_id, &details)
        .await
        .or_fail("Failed to add hobby")?;
    Ok(Json(user_hobby))
}

/// DELETE /api/user-hobbies/:hobbyId
pub async fn remove_user_hobby(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(hobby_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .remove_user_hobby(user.id(), &hobby_id)
        .await
        .or_fail("Failed to remove hobby")?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/discover-hobby-partners
pub async fn discover_hobby_partners(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<HobbyMatch>>, AppError> {
    let matches = state
        .discovery
        .users_with_shared_hobbies(user.id(), params.parsed())
        .await
        .or_fail("Failed to discover hobby partners")?;
    Ok(Json(matches))
}

/// GET /api/search-hobby-users?hobbies=a&hobbies=b
pub async fn search_hobby_users(
    State(state): State<AppState>,
    user: CurrentUser,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<HobbySearchHit>>, AppError> {
    let hobby_ids = query_values(query.as_deref(), "hobbies");
    if hobby_ids.is_empty() {
        return Err(AppError::validation("Hobby IDs required"));
    }

    let hits = state
        .discovery
        .search_users_by_hobbies(&hobby_ids, user.id())
        .await
        .or_fail("Failed to search hobby users")?;
    Ok(Json(hits))
}
