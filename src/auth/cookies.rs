//! Cookies used by the login flow

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine as _;
use rand::RngCore;

use super::session::SESSION_COOKIE;

/// OAuth `state` parameter, set on redirect and checked on callback
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
/// One-shot message shown on the next login page render
pub const FLASH_COOKIE: &str = "flash";
/// Double-submit token for state-changing forms
pub const CSRF_COOKIE: &str = "csrf_token";

const OAUTH_STATE_MAX_AGE_SECONDS: i64 = 600;
const FLASH_MAX_AGE_SECONDS: i64 = 60;

/// 32 random bytes, base64url encoded
pub fn generate_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn build_session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time_seconds(max_age_seconds))
        .build()
}

pub fn build_oauth_state_cookie(state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state))
        .path("/auth")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time_seconds(OAUTH_STATE_MAX_AGE_SECONDS))
        .build()
}

pub fn build_flash_cookie(message: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, urlencoding::encode(message).into_owned()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time_seconds(FLASH_MAX_AGE_SECONDS))
        .build()
}

pub fn build_csrf_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .build()
}

/// Removal cookie for `name`; the path must match the one it was set with
pub fn removal_cookie(name: &'static str, path: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path(path).http_only(true).build();
    cookie.make_removal();
    cookie
}

pub fn clear_session_cookie() -> Cookie<'static> {
    removal_cookie(SESSION_COOKIE, "/")
}

/// Take the flash message out of the jar, if any
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let Some(message) = jar.get(FLASH_COOKIE).map(|cookie| cookie.value().to_string()) else {
        return (jar, None);
    };
    let message = urlencoding::decode(&message)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(message);
    (jar.remove(removal_cookie(FLASH_COOKIE, "/")), Some(message))
}

/// Reuse the CSRF token from the jar or mint a new one
pub fn ensure_csrf_token(jar: CookieJar, secure: bool) -> (CookieJar, String) {
    if let Some(token) = jar
        .get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
    {
        return (jar, token);
    }
    let token = generate_token();
    (jar.add(build_csrf_cookie(token.clone(), secure)), token)
}

fn time_seconds(seconds: i64) -> time::Duration {
    time::Duration::seconds(seconds)
}
