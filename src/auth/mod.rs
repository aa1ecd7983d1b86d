//! Social sign-in
//!
//! Handles:
//! - Provider OAuth flows (GitHub, Google, Facebook)
//! - Session management
//! - Authentication middleware

pub mod cookies;
mod middleware;
mod oauth;
pub mod providers;
pub mod session;

pub use middleware::{CurrentUser, LOGIN_PATH, MaybeUser, SessionStatus, load_session, require_login};
pub use oauth::auth_router;
pub use providers::{AuthOutcome, ProviderAdapter, ProviderProfile, Providers};
pub use session::{
    Session, create_session_token, deserialize_identity, serialize_identity, verify_session_token,
};
