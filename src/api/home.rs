//! Home page
//!
//! The only page that requires a signed-in user.

use axum::{
    Router,
    extract::State,
    middleware,
    response::{Html, IntoResponse},
    routing::get,
};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::cookies::ensure_csrf_token;
use crate::auth::{CurrentUser, require_login};
use crate::views;

/// Create home router
///
/// Anonymous visitors are redirected to `/login` by the route layer.
pub fn home_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route_layer(middleware::from_fn_with_state(state, require_login))
}

/// GET /
async fn home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, csrf_token) = ensure_csrf_token(jar, state.config.should_use_secure_cookies());
    (jar, Html(views::render_home(&user, &csrf_token)))
}
