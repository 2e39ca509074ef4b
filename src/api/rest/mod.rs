//! ConnectHub REST endpoints
//!
//! Every authenticated handler takes a `CurrentUser`, which rejects the
//! request with 401 before the handler runs. Catalog reads and hobby group
//! browsing are public.

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::AppState;
use crate::data::JoinOutcome;
use crate::error::AppError;

pub mod connections;
pub mod events;
pub mod groups;
pub mod hobbies;
pub mod hobby_groups;
pub mod interests;
pub mod messages;
pub mod notifications;
pub mod skills;
pub mod users;

/// Map a capacity-checked join onto the response error, if any.
pub(crate) fn ensure_joined(
    outcome: JoinOutcome,
    full_message: &'static str,
    already_message: &'static str,
) -> Result<(), AppError> {
    match outcome {
        JoinOutcome::Joined => Ok(()),
        JoinOutcome::NotFound => Err(AppError::NotFound),
        JoinOutcome::Full => Err(AppError::validation(full_message)),
        JoinOutcome::AlreadyMember => Err(AppError::validation(already_message)),
    }
}

/// Create the `/api` router
pub fn rest_api_router() -> Router<AppState> {
    // Public endpoints (no authentication required)
    let public_routes = Router::new()
        .route("/interests", get(interests::list_interests))
        .route("/hobbies", get(hobbies::list_hobbies))
        .route("/hobby-groups", get(hobby_groups::list_hobby_groups))
        .route(
            "/hobby-groups/hobby/:hobbyId",
            get(hobby_groups::hobby_groups_by_hobby),
        )
        .route(
            "/hobby-groups/:groupId/members",
            get(hobby_groups::hobby_group_members),
        );

    let authenticated_routes = Router::new()
        // Users and profile
        .route("/auth/user", get(users::current_user))
        .route("/profile", put(users::update_profile))
        .route("/users/:userId", get(users::get_user_profile))
        .route(
            "/users/:userId/ratings",
            get(users::get_ratings).post(users::rate_user),
        )
        .route("/user-bored-status", post(users::update_bored_status))
        .route("/bored-users", get(users::bored_users))
        // Interests and discovery
        .route("/interests", post(interests::create_interest))
        .route("/user-interests", post(interests::add_user_interest))
        .route(
            "/user-interests/:interestId",
            delete(interests::remove_user_interest),
        )
        .route("/interest-groups", get(interests::interest_groups))
        .route("/discover", get(interests::discover))
        .route("/search-users", get(interests::search_users))
        // Connections
        .route(
            "/connections",
            get(connections::list_connections).post(connections::create_connection),
        )
        .route("/connection-requests", get(connections::connection_requests))
        .route(
            "/connections/:connectionId",
            put(connections::update_connection),
        )
        .route(
            "/connections/status/:userId",
            get(connections::connection_status),
        )
        // Messages
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/:userId", get(messages::get_conversation))
        .route("/messages", post(messages::send_message))
        .route("/messages/unread-count", get(messages::unread_count))
        // Activity feed and notifications
        .route("/activities", get(notifications::list_activities))
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route("/notifications/:id/read", put(notifications::mark_read))
        // Events
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route("/my-events", get(events::my_events))
        .route("/events/:eventId/join", post(events::join_event))
        .route("/events/:eventId/leave", delete(events::leave_event))
        // Groups
        .route(
            "/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route("/my-groups", get(groups::my_groups))
        .route("/groups/:groupId/join", post(groups::join_group))
        .route("/groups/:groupId/leave", delete(groups::leave_group))
        // Skills
        .route(
            "/skills",
            get(skills::list_skills).post(skills::create_skill),
        )
        .route("/my-skills", get(skills::my_skills))
        .route("/user-skills", post(skills::add_user_skill))
        .route("/user-skills/:skillId", delete(skills::remove_user_skill))
        .route("/skill-teachers", get(skills::skill_teachers))
        .route("/skill-learners", get(skills::skill_learners))
        // Hobbies
        .route("/hobbies", post(hobbies::create_hobby))
        .route("/my-hobbies", get(hobbies::my_hobbies))
        .route("/user-hobbies", post(hobbies::add_user_hobby))
        .route(
            "/user-hobbies/:hobbyId",
            delete(hobbies::remove_user_hobby),
        )
        .route(
            "/discover-hobby-partners",
            get(hobbies::discover_hobby_partners),
        )
        .route("/search-hobby-users", get(hobbies::search_hobby_users))
        // Hobby groups
        .route("/my-hobby-groups", get(hobby_groups::my_hobby_groups))
        .route("/hobby-groups", post(hobby_groups::create_hobby_group))
        .route(
            "/hobby-groups/:groupId/join",
            post(hobby_groups::join_hobby_group),
        )
        .route(
            "/hobby-groups/:groupId/leave",
            delete(hobby_groups::leave_hobby_group),
        );

    public_routes.merge(authenticated_routes)
}
