//! User, profile, bored-status and rating endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{
    BoredStatusRequest, BoredStatusResponse, CreateRatingRequest, CurrentUserResponse,
    LimitParams, PublicProfileResponse, UpdateProfileRequest, optional_text, parse_optional,
    required_text,
};
use crate::auth::CurrentUser;
use crate::data::{
    AgeGroup, ExperienceType, NewNotification, NewRating, NotificationType, ProfileUpdate, User,
    UserRating,
};
use crate::error::{AppError, OrFail};

const BORED_USERS_DEFAULT_LIMIT: usize = 20;

/// GET /api/auth/user
pub async fn current_user(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let row = state
        .db
        .get_user(user.id())
        .await
        .or_fail("Failed to fetch user")?
        .ok_or(AppError::NotFound)?;
    let interests = state
        .db
        .get_interests_by_user(user.id())
        .await
        .or_fail("Failed to fetch user")?;

    Ok(Json(CurrentUserResponse {
        user: row,
        interests,
    }))
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let update = ProfileUpdate {
        display_name: required_text(body.display_name, "Display name is required")?,
        age_group: parse_optional::<AgeGroup>(body.age_group.as_deref())?,
        location_city: optional_text(body.location_city),
        location_state: optional_text(body.location_state),
        location_country: optional_text(body.location_country),
        share_location: body.share_location,
        bio: optional_text(body.bio),
        profile_image_url: optional_text(body.profile_image_url),
    };

    let updated = state
        .db
        .update_profile(user.id(), &update)
        .await
        .or_fail("Failed to update profile")?
        .ok_or(AppError::NotFound)?;

    tracing::info!(user_id = %user.id(), "Profile updated");
    Ok(Json(updated))
}

/// GET /api/users/:userId
pub async fn get_user_profile(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<PublicProfileResponse>, AppError> {
    let row = state
        .db
        .get_user(&user_id)
        .await
        .or_fail("Failed to fetch user")?
        .ok_or(AppError::NotFound)?;
    let interests = state
        .db
        .get_interests_by_user(&user_id)
        .await
        .or_fail("Failed to fetch user")?;
    let hobbies = state
        .db
        .get_hobbies_by_user(&user_id)
        .await
        .or_fail("Failed to fetch user")?;

    Ok(Json(PublicProfileResponse {
        user: row,
        interests,
        hobbies,
    }))
}

/// POST /api/user-bored-status
pub async fn update_bored_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<BoredStatusRequest>,
) -> Result<Json<BoredStatusResponse>, AppError> {
    let is_bored = body
        .is_bored
        .ok_or_else(|| AppError::validation("isBored is required"))?;

    let updated = state
        .db
        .update_bored_status(user.id(), is_bored)
        .await
        .or_fail("Failed to update bored status")?
        .ok_or(AppError::NotFound)?;

    Ok(Json(BoredStatusResponse {
        success: true,
        message: if is_bored {
            "User marked as bored"
        } else {
            "User no longer bored"
        },
        is_bored,
        user: updated,
    }))
}

/// GET /api/bored-users
pub async fn bored_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<User>>, AppError> {
    let limit = params
        .parsed()
        .unwrap_or(BORED_USERS_DEFAULT_LIMIT)
        .clamp(1, state.config.discovery.max_limit.max(1));

    let users = state
        .db
        .get_bored_users(user.id(), limit as i64)
        .await
        .or_fail("Failed to fetch bored users")?;
    Ok(Json(users))
}

/// GET /api/users/:userId/ratings
pub async fn get_ratings(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<UserRating>>, AppError> {
    let ratings = state
        .db
        .get_user_ratings(&user_id)
        .await
        .or_fail("Failed to fetch ratings")?;
    Ok(Json(ratings))
}

/// POST /api/users/:userId/ratings
pub async fn rate_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
    Json(body): Json<CreateRatingRequest>,
) -> Result<Json<UserRating>, AppError> {
    if user_id == user.id() {
        return Err(AppError::validation("Cannot rate yourself"));
    }

    let rating = body
        .rating
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::validation("Rating must be between 1 and 5"))?;
    let experience_type = parse_optional::<ExperienceType>(body.experience_type.as_deref())?
        .ok_or_else(|| AppError::validation("Invalid experience type"))?;

    let rated = state
        .db
        .get_user(&user_id)
        .await
        .or_fail("Failed to rate user")?
        .ok_or(AppError::NotFound)?;

    let stored = state
        .db
        .create_rating(&NewRating {
            rater_id: user.id().to_string(),
            rated_user_id: rated.id.clone(),
            rating,
            experience_type,
            comment: optional_text(body.comment),
            activity_context: optional_text(body.activity_context),
        })
        .await
        .or_fail("Failed to rate user")?;

    state
        .feed
        .notify(NewNotification {
            user_id: rated.id,
            notification_type: NotificationType::Rating,
            title: "New rating".to_string(),
            message: format!("You received a {}-star rating", rating),
            related_id: Some(stored.id.clone()),
            related_type: Some("rating"),
        })
        .await;

    Ok(Json(stored))
}
