//! Authentication middleware
//!
//! Protects routes that require authentication and turns a verified
//! session into the caller's user row.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(cookie_name).map(|cookie| cookie.value().to_owned())
        })
}

fn authenticate_headers(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = extract_token_from_headers(headers, &state.config.auth.cookie_name)
        .ok_or(AppError::Unauthorized)?;
    verify_session_token(&token, &state.config.auth.session_secret)
}

/// Middleware to require authentication
///
/// Verifies the session from cookie or Authorization header and adds it
/// to request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate_headers(request.headers(), &state)?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated caller
///
/// Verifies the token, then creates or refreshes the caller's user row so
/// that every authenticated handler can rely on it existing.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(session): CurrentUser) -> String {
///     session.user_id
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>().cloned() {
            return Ok(user);
        }

        let state = AppState::from_ref(state);
        let session = match parts.extensions.get::<Session>().cloned() {
            Some(session) => session,
            None => authenticate_headers(&parts.headers, &state)?,
        };

        let (_, created) = state.db.upsert_user(&session.to_upsert()).await.map_err(|error| {
            tracing::error!(%error, user_id = %session.user_id, "Failed to provision user");
            AppError::Failed("Failed to fetch user")
        })?;
        if created {
            crate::metrics::USERS_TOTAL.inc();
            tracing::info!(user_id = %session.user_id, "User created on first sign-in");
        }

        let user = CurrentUser(session);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
