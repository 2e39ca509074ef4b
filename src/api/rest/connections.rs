//! Connection request endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use crate::AppState;
use crate::api::dto::{
    ConnectionListParams, CreateConnectionRequest, UpdateConnectionRequest, parse_optional,
    required_text,
};
use crate::auth::CurrentUser;
use crate::data::{Connection, ConnectionStatus, ConnectionWithRequester, ConnectionWithUser};
use crate::error::{AppError, OrFail};

/// GET /api/connections?status=accepted
pub async fn list_connections(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ConnectionListParams>,
) -> Result<Json<Vec<ConnectionWithUser>>, AppError> {
    let status = parse_optional::<ConnectionStatus>(params.status.as_deref())?
        .unwrap_or(ConnectionStatus::Accepted);

    let connections = state
        .connections
        .list(user.id(), status)
        .await
        .or_fail("Failed to fetch connections")?;
    Ok(Json(connections))
}

/// GET /api/connection-requests
pub async fn connection_requests(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ConnectionWithRequester>>, AppError> {
    let requests = state
        .connections
        .pending_requests(user.id())
        .await
        .or_fail("Failed to fetch connection requests")?;
    Ok(Json(requests))
}

/// POST /api/connections
pub async fn create_connection(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateConnectionRequest>,
) -> Result<Json<Connection>, AppError> {
    let receiver_id = required_text(body.receiver_id, "Receiver ID is required")?;
    let connection = state
        .connections
        .request(user.id(), &receiver_id)
        .await
        .or_fail("Failed to create connection")?;
    Ok(Json(connection))
}

/// PUT /api/connections/:connectionId
pub async fn update_connection(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(connection_id): Path<String>,
    Json(body): Json<UpdateConnectionRequest>,
) -> Result<Json<Connection>, AppError> {
    let status = match body.status.as_deref() {
        Some("accepted") => ConnectionStatus::Accepted,
        Some("declined") => ConnectionStatus::Declined,
        _ => return Err(AppError::validation("Invalid status")),
    };

    let connection = state
        .connections
        .respond(user.id(), &connection_id, status)
        .await
        .or_fail("Failed to update connection")?;
    Ok(Json(connection))
}

/// GET /api/connections/status/:userId
pub async fn connection_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(other_id): Path<String>,
) -> Result<Json<Option<Connection>>, AppError> {
    let connection = state
        .connections
        .status_between(user.id(), &other_id)
        .await
        .or_fail("Failed to fetch connection status")?;
    Ok(Json(connection))
}
