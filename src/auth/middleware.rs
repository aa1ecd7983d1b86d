//! Authentication middleware
//!
//! Protects routes that require a signed-in user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::cookies::clear_session_cookie;
use super::session::{SESSION_COOKIE, deserialize_identity, verify_session_token};
use crate::AppState;
use crate::data::User;
use crate::error::AppError;

/// Where anonymous visitors are sent
pub const LOGIN_PATH: &str = "/login";

/// What the session cookie on a request amounts to
#[derive(Debug)]
pub enum SessionStatus {
    /// No session cookie
    Anonymous,
    /// Valid session resolved to a user
    Authenticated(User),
    /// Cookie present but unusable (bad signature, expired, no matching identity)
    Invalid,
}

/// Resolve the session cookie in `jar` to a user.
///
/// # Errors
/// Store errors from the identity service propagate.
pub async fn load_session(jar: &CookieJar, state: &AppState) -> Result<SessionStatus, AppError> {
    let Some(token) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()) else {
        return Ok(SessionStatus::Anonymous);
    };

    let session = match verify_session_token(&token, &state.config.auth.session_secret) {
        Ok(session) => session,
        Err(error) => {
            tracing::debug!(%error, "Rejected session cookie");
            return Ok(SessionStatus::Invalid);
        }
    };

    match deserialize_identity(&session.identity, &state.identities).await {
        Ok(user) => Ok(SessionStatus::Authenticated(user)),
        Err(AppError::IdentityNotFound) | Err(AppError::Validation(_)) => {
            tracing::warn!(identity = %session.identity, "Session names no matching identity");
            Ok(SessionStatus::Invalid)
        }
        Err(error) => Err(error),
    }
}

/// Redirect to the login page, dropping an unusable session cookie
fn login_redirect(jar: CookieJar, clear_session: bool) -> Response {
    let jar = if clear_session {
        jar.remove(clear_session_cookie())
    } else {
        jar
    };
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}

/// Middleware to require a signed-in user
///
/// Anonymous requests are redirected to `/login`. On success the
/// resolved [`User`] is added to the request extensions.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/", get(home))
///     .route_layer(middleware::from_fn_with_state(state, require_login));
/// ```
pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    match load_session(&jar, &state).await? {
        SessionStatus::Authenticated(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        SessionStatus::Anonymous => Ok(login_redirect(jar, false)),
        SessionStatus::Invalid => Ok(login_redirect(jar, true)),
    }
}

/// Extractor for the signed-in user
///
/// Rejects anonymous requests with a redirect to the login page.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.provider_user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(CurrentUser(user));
        }

        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        match load_session(&jar, &state).await {
            Ok(SessionStatus::Authenticated(user)) => {
                parts.extensions.insert(user.clone());
                Ok(CurrentUser(user))
            }
            Ok(SessionStatus::Anonymous) => Err(login_redirect(jar, false)),
            Ok(SessionStatus::Invalid) => Err(login_redirect(jar, true)),
            Err(error) => Err(error.into_response()),
        }
    }
}

/// Optional current user extractor
///
/// Returns None if not signed in, instead of redirecting. Store errors
/// still fail the request.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(MaybeUser(Some(user)));
        }

        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let user = match load_session(&jar, &state).await {
            Ok(SessionStatus::Authenticated(user)) => Some(user),
            Ok(_) => None,
            Err(error) => {
                tracing::error!(%error, "Failed to load session");
                return Err(error.into_response());
            }
        };

        if let Some(user) = &user {
            parts.extensions.insert(user.clone());
        }

        Ok(MaybeUser(user))
    }
}
