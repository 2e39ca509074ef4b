//! Authentication
//!
//! Handles:
//! - Signed session tokens issued by the identity provider
//! - Authentication middleware and the `CurrentUser` extractor

mod middleware;
pub mod session;

pub use middleware::{CurrentUser, require_auth};
pub use session::{Session, create_session_token, verify_session_token};
