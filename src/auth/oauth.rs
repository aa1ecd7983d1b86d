//! Provider sign-in flow
//!
//! Implements the OAuth 2.0 authorization code flow for every configured
//! provider, plus the login page and logout.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::cookies::{
    CSRF_COOKIE, OAUTH_STATE_COOKIE, build_flash_cookie, build_oauth_state_cookie,
    build_session_cookie, clear_session_cookie, ensure_csrf_token, generate_token,
    removal_cookie, take_flash,
};
use super::middleware::{LOGIN_PATH, MaybeUser};
use super::providers::{AuthOutcome, ProviderAdapter};
use super::session::{Session, create_session_token};
use crate::AppState;
use crate::data::Provider;
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;
use crate::views;

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - POST /logout - Logout
/// - GET /auth/{provider} - Redirect to the provider
/// - GET /auth/{provider}/callback - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/logout", post(logout))
        .route("/auth/:provider", get(provider_redirect))
        .route("/auth/:provider/callback", get(provider_callback))
}

fn configured_adapter<'a>(state: &'a AppState, name: &str) -> Result<&'a ProviderAdapter, AppError> {
    let provider: Provider = name.parse().map_err(|_| AppError::NotFound)?;
    state.providers.get(provider).ok_or(AppError::NotFound)
}

// =============================================================================
// Login / Logout
// =============================================================================

/// GET /login
///
/// Lists the configured providers and shows any pending flash message.
async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> impl IntoResponse {
    let secure = state.config.should_use_secure_cookies();
    let (jar, flash) = take_flash(jar);
    let (jar, csrf_token) = ensure_csrf_token(jar, secure);

    let page = views::render_login(
        &state.providers.enabled(),
        flash.as_deref(),
        user.as_ref(),
        &csrf_token,
    );
    (jar, Html(page))
}

#[derive(Debug, Deserialize)]
struct LogoutForm {
    #[serde(rename = "_csrf", default)]
    csrf: String,
}

/// POST /logout
///
/// Clears the session cookie and redirects to login.
async fn logout(jar: CookieJar, Form(form): Form<LogoutForm>) -> Result<Response, AppError> {
    match jar.get(CSRF_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() && cookie.value() == form.csrf => {}
        _ => {
            tracing::warn!("Logout rejected: CSRF token mismatch");
            return Err(AppError::Forbidden);
        }
    }

    let jar = jar.remove(clear_session_cookie());
    Ok((jar, Redirect::to(LOGIN_PATH)).into_response())
}

// =============================================================================
// Provider OAuth
// =============================================================================

/// GET /auth/{provider}
///
/// Redirects the user to the provider's authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect with client_id, redirect_uri, scope, state
async fn provider_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let adapter = configured_adapter(&state, &provider)?;

    let oauth_state = generate_token();
    let url = adapter.authorization_url(&oauth_state)?;
    let jar = jar.add(build_oauth_state_cookie(
        oauth_state,
        state.config.should_use_secure_cookies(),
    ));

    tracing::debug!(provider = %adapter.provider(), "Redirecting to provider");
    Ok((jar, Redirect::to(url.as_str())))
}

/// Query parameters on the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set when the user denied consent or the provider refused
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /auth/{provider}/callback
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token and fetch the profile
/// 3. Find or create the local user
/// 4. Set the session cookie and redirect home
///
/// Any provider-side failure flashes a message and redirects to login.
async fn provider_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let adapter = configured_adapter(&state, &provider)?;
    let provider = adapter.provider();
    let secure = state.config.should_use_secure_cookies();

    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(removal_cookie(OAUTH_STATE_COOKIE, "/auth"));

    let outcome = if let Some(error) = query.error {
        tracing::info!(
            provider = %provider,
            error = %error,
            description = ?query.error_description,
            "Provider returned an error"
        );
        AuthOutcome::Failure(format!(
            "Sign in with {} was cancelled or refused.",
            provider.display_name()
        ))
    } else if expected_state.is_none() || expected_state != query.state {
        tracing::warn!(provider = %provider, "OAuth state mismatch");
        AuthOutcome::Failure("Your sign-in attempt expired. Please try again.".to_string())
    } else if let Some(code) = query.code.as_deref().filter(|code| !code.is_empty()) {
        adapter
            .authenticate(&state.http_client, &state.identities, code)
            .await?
    } else {
        AuthOutcome::Failure(format!(
            "{} did not return an authorization code.",
            provider.display_name()
        ))
    };

    match outcome {
        AuthOutcome::Success(user) => {
            LOGINS_TOTAL
                .with_label_values(&[provider.as_str(), "success"])
                .inc();
            let max_age = state.config.auth.session_max_age;
            let token = create_session_token(
                &Session::for_user(&user, max_age)?,
                &state.config.auth.session_secret,
            )?;
            tracing::info!(user_id = %user.id, provider = %provider, "User signed in");

            let jar = jar.add(build_session_cookie(token, max_age, secure));
            Ok((jar, Redirect::to("/")).into_response())
        }
        AuthOutcome::Failure(message) => {
            LOGINS_TOTAL
                .with_label_values(&[provider.as_str(), "failure"])
                .inc();
            let jar = jar.add(build_flash_cookie(&message, secure));
            Ok((jar, Redirect::to(LOGIN_PATH)).into_response())
        }
    }
}
