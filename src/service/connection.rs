//! Connection service
//!
//! Drives the request lifecycle between two users:
//! `pending` → `accepted` | `declined`. A pair has at most one row; the
//! unique index on the canonical pair rejects concurrent duplicates.

use std::sync::Arc;

use super::FeedService;
use crate::config::ConnectionsConfig;
use crate::data::{
    ActivityType, Connection, ConnectionStatus, ConnectionWithRequester, ConnectionWithUser,
    Database, NewActivity, NewNotification, NotificationType,
};
use crate::error::AppError;
use crate::metrics::{CONNECTION_REQUESTS_TOTAL, CONNECTION_RESPONSES_TOTAL};

/// Connection service
pub struct ConnectionService {
    db: Arc<Database>,
    feed: Arc<FeedService>,
    config: ConnectionsConfig,
}

impl ConnectionService {
    pub fn new(db: Arc<Database>, feed: Arc<FeedService>, config: ConnectionsConfig) -> Self {
        Self { db, feed, config }
    }

    /// Send a connection request from `requester_id` to `receiver_id`.
    ///
    /// # Errors
    /// `Validation` for self-requests or when the pair already has a row,
    /// `NotFound` when the receiver does not exist.
    pub async fn request(
        &self,
        requester_id: &str,
        receiver_id: &str,
    ) -> Result<Connection, AppError> {
        if requester_id == receiver_id {
            CONNECTION_REQUESTS_TOTAL.with_label_values(&["self"]).inc();
            return Err(AppError::validation("Cannot connect with yourself"));
        }

        let receiver = self.db.get_user(receiver_id).await?.ok_or(AppError::NotFound)?;
        let requester = self.db.get_user(requester_id).await?.ok_or(AppError::NotFound)?;

        let mut connection = self
            .db
            .insert_connection_if_absent(requester_id, receiver_id)
            .await?;
        if connection.is_none() && self.config.allow_rerequest_after_decline {
            connection = self
                .db
                .reopen_declined_connection(requester_id, receiver_id)
                .await?;
        }

        let Some(connection) = connection else {
            CONNECTION_REQUESTS_TOTAL.with_label_values(&["duplicate"]).inc();
            return Err(AppError::validation("Connection already exists"));
        };

        CONNECTION_REQUESTS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            connection_id = %connection.id,
            requester_id = %requester_id,
            receiver_id = %receiver.id,
            "Connection requested"
        );

        self.feed
            .notify(NewNotification {
                user_id: receiver.id.clone(),
                notification_type: NotificationType::ConnectionRequest,
                title: "New connection request".to_string(),
                message: format!("{} wants to connect with you", requester.public_name()),
                related_id: Some(connection.id.clone()),
                related_type: Some("connection"),
            })
            .await;

        Ok(connection)
    }

    /// Accept or decline a pending request addressed to `caller_id`.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `Forbidden` when the caller is not the
    /// receiver, `Validation` when the row is no longer pending or `status`
    /// is not a response.
    pub async fn respond(
        &self,
        caller_id: &str,
        connection_id: &str,
        status: ConnectionStatus,
    ) -> Result<Connection, AppError> {
        if status == ConnectionStatus::Pending {
            return Err(AppError::validation("Invalid status"));
        }

        let connection = self
            .db
            .get_connection(connection_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if connection.receiver_id != caller_id {
            return Err(AppError::Forbidden);
        }

        if !self
            .db
            .resolve_pending_connection(connection_id, status)
            .await?
        {
            return Err(AppError::validation("Connection is not pending"));
        }

        CONNECTION_RESPONSES_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
        tracing::info!(connection_id = %connection_id, status = %status, "Connection resolved");

        if status == ConnectionStatus::Accepted {
            self.announce_acceptance(&connection).await?;
        }

        self.db
            .get_connection(connection_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn announce_acceptance(&self, connection: &Connection) -> Result<(), AppError> {
        let ids = vec![
            connection.requester_id.clone(),
            connection.receiver_id.clone(),
        ];
        let users = self.db.get_users_by_ids(&ids).await?;
        let name_of = |id: &str| {
            users
                .get(id)
                .map(|user| user.public_name())
                .unwrap_or_else(|| "Someone".to_string())
        };
        let requester_name = name_of(&connection.requester_id);
        let receiver_name = name_of(&connection.receiver_id);

        self.feed
            .notify(NewNotification {
                user_id: connection.requester_id.clone(),
                notification_type: NotificationType::ConnectionAccepted,
                title: "Connection accepted".to_string(),
                message: format!("{} accepted your connection request", receiver_name),
                related_id: Some(connection.id.clone()),
                related_type: Some("connection"),
            })
            .await;

        for (user_id, other_name) in [
            (&connection.requester_id, &receiver_name),
            (&connection.receiver_id, &requester_name),
        ] {
            self.feed
                .record(NewActivity {
                    user_id: user_id.clone(),
                    activity_type: ActivityType::Connection,
                    title: format!("Connected with {}", other_name),
                    description: None,
                    metadata: Some(serde_json::json!({ "connectionId": connection.id })),
                    is_public: true,
                })
                .await;
        }

        Ok(())
    }

    /// Connections in `status` involving the user, each joined to the
    /// other party.
    pub async fn list(
        &self,
        user_id: &str,
        status: ConnectionStatus,
    ) -> Result<Vec<ConnectionWithUser>, AppError> {
        let connections = self.db.get_connections(user_id, status).await?;
        self.with_other_party(user_id, connections).await
    }

    /// Pending requests addressed to the user, each joined to the requester.
    pub async fn pending_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConnectionWithRequester>, AppError> {
        let connections = self.db.get_pending_requests(user_id).await?;
        let ids: Vec<String> = connections.iter().map(|c| c.requester_id.clone()).collect();
        let requesters = self.db.get_users_by_ids(&ids).await?;

        Ok(connections
            .into_iter()
            .filter_map(|connection| {
                let requester = requesters.get(&connection.requester_id)?.clone();
                Some(ConnectionWithRequester {
                    connection,
                    requester,
                })
            })
            .collect())
    }

    /// The pair's row, if any.
    pub async fn status_between(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<Option<Connection>, AppError> {
        self.db.get_connection_between(user_id, other_id).await
    }

    async fn with_other_party(
        &self,
        user_id: &str,
        connections: Vec<Connection>,
    ) -> Result<Vec<ConnectionWithUser>, AppError> {
        let ids: Vec<String> = connections
            .iter()
            .map(|c| c.other_party(user_id).to_string())
            .collect();
        let users = self.db.get_users_by_ids(&ids).await?;

        Ok(connections
            .into_iter()
            .filter_map(|connection| {
                let user = users.get(connection.other_party(user_id))?.clone();
                Some(ConnectionWithUser { connection, user })
            })
            .collect())
    }
}
