//! REST request and response DTOs
//!
//! Request bodies keep every field optional so that handlers can answer a
//! missing field with a `{"message"}` 400 instead of a deserializer error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::data::{HobbyWithUserDetails, Interest, User};
use crate::error::AppError;

// =============================================================================
// Field helpers
// =============================================================================

/// Trimmed non-empty text, or `Validation(message)`.
pub fn required_text(value: Option<String>, message: &'static str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(message))
}

/// Drop blank optional text.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional string-backed enum; unknown values are rejected.
pub fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = AppError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
}

/// All values of `key` in a raw query string.
///
/// Accepts both `key=a&key=b` and the bracketed `key[]=a` form. Blank values
/// are skipped.
pub fn query_values(raw: Option<&str>, key: &str) -> Vec<String> {
    let bracketed = format!("{}[]", key);
    url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
        .filter(|(k, v)| (k == key || *k == bracketed) && !v.trim().is_empty())
        .map(|(_, v)| v.into_owned())
        .collect()
}

// =============================================================================
// Query parameters
// =============================================================================

/// `?limit=` kept as text; unparsable or zero values fall back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

impl LimitParams {
    pub fn parsed(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectionListParams {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnreadParams {
    pub from: Option<String>,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub age_group: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub share_location: Option<bool>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoredStatusRequest {
    pub is_bored: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInterestRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserInterestRequest {
    pub interest_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub receiver_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConnectionRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Option<String>,
    pub content: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attendees: Option<i64>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinEventRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSkillRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserSkillRequest {
    pub skill_id: Option<String>,
    pub level: Option<String>,
    #[serde(default)]
    pub is_teaching: bool,
    #[serde(default)]
    pub is_learning: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHobbyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub is_elderly_friendly: bool,
    pub difficulty_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserHobbyRequest {
    pub hobby_id: Option<String>,
    pub experience_level: Option<String>,
    pub is_looking_for_partners: Option<bool>,
    pub available_schedule: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHobbyGroupRequest {
    pub hobby_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<serde_json::Value>,
    pub max_members: Option<i64>,
    pub target_age_group: Option<String>,
    pub meeting_schedule: Option<serde_json::Value>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub rating: Option<i64>,
    pub experience_type: Option<String>,
    pub comment: Option<String>,
    pub activity_context: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// The caller's own user row with their interests
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub interests: Vec<Interest>,
}

/// Another user's profile as shown on their page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub interests: Vec<Interest>,
    pub hobbies: Vec<HobbyWithUserDetails>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoredStatusResponse {
    pub success: bool,
    pub message: &'static str,
    pub is_bored: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AgeGroup;

    #[test]
    fn query_values_collects_repeated_keys() {
        let values = query_values(Some("interests=a&interests=b&limit=3"), "interests");
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn query_values_accepts_bracketed_keys_and_skips_blanks() {
        let values = query_values(Some("hobbies%5B%5D=x&hobbies=&hobbies=y"), "hobbies");
        assert_eq!(values, vec!["x", "y"]);
        assert!(query_values(None, "hobbies").is_empty());
    }

    #[test]
    fn limit_falls_back_on_garbage_and_zero() {
        let limit = |raw: &str| LimitParams { limit: Some(raw.to_string()) }.parsed();
        assert_eq!(limit("5"), Some(5));
        assert_eq!(limit("abc"), None);
        assert_eq!(limit("0"), None);
        assert_eq!(LimitParams::default().parsed(), None);
    }

    #[test]
    fn required_text_rejects_blank() {
        let error = required_text(Some("   ".to_string()), "Name is required").unwrap_err();
        assert!(matches!(error, AppError::Validation(message) if message == "Name is required"));
        assert_eq!(required_text(Some(" Ann ".to_string()), "x").unwrap(), "Ann");
    }

    #[test]
    fn parse_optional_treats_blank_as_absent() {
        assert_eq!(parse_optional::<AgeGroup>(Some("")).unwrap(), None);
        assert_eq!(
            parse_optional::<AgeGroup>(Some("26-35")).unwrap(),
            Some(AgeGroup::From26To35)
        );
        assert!(parse_optional::<AgeGroup>(Some("teen")).is_err());
    }

    #[test]
    fn update_profile_request_uses_camel_case() {
        let body: UpdateProfileRequest = serde_json::from_value(serde_json::json!({
            "displayName": "Ann",
            "shareLocation": true
        }))
        .unwrap();
        assert_eq!(body.display_name.as_deref(), Some("Ann"));
        assert_eq!(body.share_location, Some(true));
    }
}
