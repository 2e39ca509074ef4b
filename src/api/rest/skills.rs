//! Skill catalog and skill exchange

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{
    AddUserSkillRequest, CreateSkillRequest, SuccessResponse, optional_text, parse_optional,
    required_text,
};
use crate::auth::CurrentUser;
use crate::data::{
    NewSkill, NewUserSkill, Skill, SkillHolder, SkillLevel, SkillWithUserDetails, UserSkill,
};
use crate::error::{AppError, OrFail};

/// GET /api/skills
pub async fn list_skills(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Skill>>, AppError> {
    let skills = state.db.get_skills().await.or_fail("Failed to fetch skills")?;
    Ok(Json(skills))
}

/// POST /api/skills
pub async fn create_skill(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<CreateSkillRequest>,
) -> Result<Json<Skill>, AppError> {
    let new = NewSkill {
        name: required_text(body.name, "Skill name is required")?,
        category: required_text(body.category, "Skill category is required")?,
        description: optional_text(body.description),
    };

    let skill = state
        .db
        .create_skill(&new)
        .await
        .or_fail("Failed to create skill")?
        .ok_or_else(|| AppError::validation("Skill already exists"))?;
    Ok(Json(skill))
}

/// GET /api/my-skills
pub async fn my_skills(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SkillWithUserDetails>>, AppError> {
    let skills = state
        .db
        .get_user_skills(user.id())
        .await
        .or_fail("Failed to fetch user skills")?;
    Ok(Json(skills))
}

/// POST /api/user-skills
pub async fn add_user_skill(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<AddUserSkillRequest>,
) -> Result<Json<UserSkill>, AppError> {
    let skill_id = required_text(body.skill_id, "Skill ID is required")?;
    let details = NewUserSkill {
        level: parse_optional::<SkillLevel>(body.level.as_deref())?
            .unwrap_or(SkillLevel::Beginner),
        is_teaching: body.is_teaching,
        is_learning: body.is_learning,
    };

    state
        .db
        .get_skill(&skill_id)
        .await
        .or_fail("Failed to add user skill")?
        .ok_or(AppError::NotFound)?;

    let user_skill = state
        .db
        .add_user_skill(user.id(), &skill_id, &details)
        .await
        .or_fail("Failed to add user skill")?;
    Ok(Json(user_skill))
}

/// DELETE /api/user-skills/:skillId
pub async fn remove_user_skill(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(skill_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .remove_user_skill(user.id(), &skill_id)
        .await
        .or_fail("Failed to remove user skill")?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/skill-teachers
pub async fn skill_teachers(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<SkillHolder>>, AppError> {
    let holders = state
        .db
        .get_skill_holders(true)
        .await
        .or_fail("Failed to fetch skill teachers")?;
    Ok(Json(holders))
}

/// GET /api/skill-learners
pub async fn skill_learners(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<SkillHolder>>, AppError> {
    let holders = state
        .db
        .get_skill_holders(false)
        .await
        .or_fail("Failed to fetch skill learners")?;
    Ok(Json(holders))
}
