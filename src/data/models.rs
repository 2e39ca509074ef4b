//! Data models
//!
//! Rust structs representing database rows and the small string-backed
//! enums stored in them. Catalog and content ids are ULIDs; user ids come
//! from the identity provider. All models serialize with camelCase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// String-backed enums
// =============================================================================

/// Declares an enum stored as TEXT, with `as_str` and a `FromStr` that
/// rejects unknown values as `AppError::Validation("Invalid <label>")`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(AppError::Validation(concat!("Invalid ", $label).to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Lifecycle of a connection between two users
    ConnectionStatus, "status" {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
    }
}

text_enum! {
    AgeGroup, "age group" {
        From18To25 => "18-25",
        From26To35 => "26-35",
        From36To45 => "36-45",
        From46To55 => "46-55",
        From56To65 => "56-65",
        Over65 => "65+",
    }
}

text_enum! {
    /// Target audience of a hobby group; `mixed` is allowed in addition to
    /// the profile age groups.
    TargetAgeGroup, "target age group" {
        From18To25 => "18-25",
        From26To35 => "26-35",
        From36To45 => "36-45",
        From46To55 => "46-55",
        From56To65 => "56-65",
        Over65 => "65+",
        Mixed => "mixed",
    }
}

text_enum! {
    ExperienceLevel, "experience level" {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

text_enum! {
    SkillLevel, "skill level" {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Expert => "expert",
    }
}

text_enum! {
    DifficultyLevel, "difficulty level" {
        Easy => "easy",
        Moderate => "moderate",
        Challenging => "challenging",
    }
}

text_enum! {
    AttendeeStatus, "attendance status" {
        Going => "going",
        Maybe => "maybe",
        NotGoing => "not_going",
    }
}

text_enum! {
    GroupRole, "group role" {
        Admin => "admin",
        Moderator => "moderator",
        Member => "member",
    }
}

text_enum! {
    HobbyGroupRole, "hobby group role" {
        Member => "member",
        Organizer => "organizer",
        CoOrganizer => "co-organizer",
    }
}

text_enum! {
    /// What a user rating is about
    ExperienceType, "experience type" {
        EventAttendance => "event_attendance",
        Reliability => "reliability",
        Communication => "communication",
        Safety => "safety",
    }
}

text_enum! {
    NotificationType, "notification type" {
        ConnectionRequest => "connection_request",
        ConnectionAccepted => "connection_accepted",
        Message => "message",
        EventJoined => "event_joined",
        GroupJoined => "group_joined",
        HobbyGroupJoined => "hobby_group_joined",
        Rating => "rating",
    }
}

text_enum! {
    ActivityType, "activity type" {
        Connection => "connection",
        Interest => "interest",
        Event => "event",
        Group => "group",
        HobbyGroup => "hobby_group",
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity provider subject
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub display_name: Option<String>,
    pub age_group: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub share_location: bool,
    pub bio: Option<String>,
    pub is_bored: bool,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown to other users in notifications and activity titles
    pub fn public_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            _ => "Someone".to_string(),
        }
    }
}

/// Claims copied onto the user row on every authenticated request
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Editable profile fields. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub age_group: Option<AgeGroup>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub share_location: Option<bool>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

/// The part of a user shown next to messages
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: user.display_name.clone(),
            profile_image_url: user.profile_image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
    pub id: String,
    pub rater_id: String,
    pub rated_user_id: String,
    pub rating: i64,
    pub experience_type: String,
    pub comment: Option<String>,
    pub activity_context: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Hobby {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_elderly_friendly: bool,
    pub difficulty_level: String,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserHobby {
    pub id: String,
    pub user_id: String,
    pub hobby_id: String,
    pub experience_level: String,
    pub is_looking_for_partners: bool,
    pub available_schedule: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSkill {
    pub id: String,
    pub user_id: String,
    pub skill_id: String,
    pub level: String,
    pub is_teaching: bool,
    pub is_learning: bool,
    pub created_at: DateTime<Utc>,
}

/// A hobby together with the caller's junction row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HobbyWithUserDetails {
    #[serde(flatten)]
    pub hobby: Hobby,
    pub user_hobby: UserHobby,
}

/// A skill together with a user's junction row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillWithUserDetails {
    #[serde(flatten)]
    pub skill: Skill,
    pub user_skill: UserSkill,
}

/// A user who teaches or is learning a skill
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillHolder {
    #[serde(flatten)]
    pub user: User,
    pub user_skill: UserSkill,
    pub skill: Skill,
}

/// An interest treated as a group of its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InterestGroup {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub interest: Interest,
    pub bored_count: i64,
}

// =============================================================================
// Connections and messages
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub requester_id: String,
    pub receiver_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// The party that is not `user_id`
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.requester_id == user_id {
            &self.receiver_id
        } else {
            &self.requester_id
        }
    }
}

/// Ordered pair used for the one-row-per-pair unique index
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// A connection joined to the other party
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionWithUser {
    #[serde(flatten)]
    pub connection: Connection,
    pub user: User,
}

/// An incoming request joined to the user who sent it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionWithRequester {
    #[serde(flatten)]
    pub connection: Connection,
    pub requester: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_read: bool,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithUsers {
    #[serde(flatten)]
    pub message: Message,
    pub sender: UserSummary,
    pub receiver: UserSummary,
}

/// Latest message and unread count for one counterpart
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user: UserSummary,
    pub last_message: Message,
    pub unread_count: i64,
}

// =============================================================================
// Activities and notifications
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWithUser {
    #[serde(flatten)]
    pub activity: Activity,
    pub user: User,
}

/// Input for `Database::create_activity`
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: String,
    pub activity_type: ActivityType,
    pub title: String,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    pub related_type: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for `Database::create_notification`
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    pub related_type: Option<&'static str>,
}

// =============================================================================
// Events and groups
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub creator_id: String,
    pub max_attendees: Option<i64>,
    pub attendee_count: i64,
    pub image_url: Option<String>,
    pub tags: Option<Json<Vec<String>>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithCreator {
    #[serde(flatten)]
    pub event: Event,
    pub creator: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub is_private: bool,
    pub member_count: i64,
    pub image_url: Option<String>,
    pub tags: Option<Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupWithCreator {
    #[serde(flatten)]
    pub group: Group,
    pub creator: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HobbyGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub hobby_id: String,
    pub creator_id: String,
    pub location: Option<Json<serde_json::Value>>,
    pub max_members: i64,
    pub current_members: i64,
    pub target_age_group: Option<String>,
    pub meeting_schedule: Option<Json<serde_json::Value>>,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HobbyGroupDetails {
    #[serde(flatten)]
    pub group: HobbyGroup,
    /// Same value as `currentMembers`
    pub member_count: i64,
    pub hobby: Hobby,
    pub creator: User,
    /// Caller's role, present only in "my hobby groups"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HobbyGroupMember {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HobbyGroupMemberWithUser {
    #[serde(flatten)]
    pub member: HobbyGroupMember,
    pub user: User,
}

// =============================================================================
// Inserts
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewInterest {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHobby {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_elderly_friendly: bool,
    pub difficulty_level: DifficultyLevel,
}

#[derive(Debug, Clone)]
pub struct NewSkill {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUserHobby {
    pub experience_level: ExperienceLevel,
    pub is_looking_for_partners: bool,
    pub available_schedule: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewUserSkill {
    pub level: SkillLevel,
    pub is_teaching: bool,
    pub is_learning: bool,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attendees: Option<i64>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub creator_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewHobbyGroup {
    pub creator_id: String,
    pub hobby_id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<serde_json::Value>,
    pub max_members: i64,
    pub target_age_group: Option<TargetAgeGroup>,
    pub meeting_schedule: Option<serde_json::Value>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub rater_id: String,
    pub rated_user_id: String,
    pub rating: i64,
    pub experience_type: ExperienceType,
    pub comment: Option<String>,
    pub activity_context: Option<String>,
}

/// One `(holder, entity)` junction row used by matching and search
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberInterestRow {
    pub member_id: String,
    #[sqlx(flatten)]
    pub interest: Interest,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberHobbyRow {
    pub member_id: String,
    #[sqlx(flatten)]
    pub hobby: Hobby,
}

/// Outcome of a capacity-checked membership insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Full,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_status_parses_known_values() {
        assert_eq!(
            "accepted".parse::<ConnectionStatus>().unwrap(),
            ConnectionStatus::Accepted
        );
        assert_eq!(ConnectionStatus::Declined.as_str(), "declined");
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let error = "maybe".parse::<ConnectionStatus>().unwrap_err();
        assert!(matches!(error, AppError::Validation(message) if message == "Invalid status"));
    }

    #[test]
    fn age_group_accepts_open_ended_bucket() {
        assert_eq!("65+".parse::<AgeGroup>().unwrap(), AgeGroup::Over65);
        assert!("mixed".parse::<AgeGroup>().is_err());
        assert_eq!(
            "mixed".parse::<TargetAgeGroup>().unwrap(),
            TargetAgeGroup::Mixed
        );
    }

    #[test]
    fn canonical_pair_is_order_independent() {
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
    }

    #[test]
    fn other_party_picks_the_counterpart() {
        let now = Utc::now();
        let connection = Connection {
            id: EntityId::new().0,
            requester_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            status: ConnectionStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(connection.other_party("alice"), "bob");
        assert_eq!(connection.other_party("bob"), "alice");
    }
}
