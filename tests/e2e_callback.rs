//! E2E tests for the provider callback against mocked provider endpoints

mod common;

use common::{TestServer, location, set_cookie_value};
use serde_json::json;
use socialgate::data::Provider;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn callback(server: &TestServer, provider: &str, code: &str) -> reqwest::Response {
    server
        .client
        .get(server.url(&format!(
            "/auth/{provider}/callback?code={code}&state=state-1"
        )))
        .header("Cookie", "oauth_state=state-1")
        .send()
        .await
        .expect("request succeeds")
}

#[tokio::test]
async fn test_github_callback_signs_user_in() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_string_contains("code=good-code"))
        .and(body_string_contains("client_id=github-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_abc",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer gho_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1001,
            "login": "octocat",
            "avatar_url": "https://avatars.githubusercontent.com/u/1001"
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let server = TestServer::with_mock_provider(&mock.uri()).await;
    let response = callback(&server, "github", "good-code").await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
    let session = set_cookie_value(&response, "session").expect("session cookie");

    let home = server
        .client
        .get(server.url("/"))
        .header("Cookie", format!("session={session}"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(home.status(), 200);
    let body = home.text().await.expect("response body");
    assert!(body.contains("1001"));
    assert!(body.contains("https://avatars.githubusercontent.com/u/1001"));

    let user = server
        .state
        .db
        .find_user_by_provider(Provider::GitHub, "1001")
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(user.access_token.as_deref(), Some("gho_abc"));
}

#[tokio::test]
async fn test_repeat_login_reuses_user() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.token",
            "token_type": "Bearer"
        })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "108",
            "name": "Test User",
            "picture": "https://lh3.googleusercontent.com/a/photo.jpg"
        })))
        .mount(&mock)
        .await;

    let server = TestServer::with_mock_provider(&mock.uri()).await;

    let first = callback(&server, "google", "code-1").await;
    let second = callback(&server, "google", "code-2").await;
    assert_eq!(location(&first), "/");
    assert_eq!(location(&second), "/");

    assert_eq!(
        server.state.db.count_users(Some(Provider::Google)).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_facebook_callback_sends_appsecret_proof() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "EAAB",
            "token_type": "bearer"
        })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "10157",
            "name": "Test User",
            "picture": { "data": { "url": "https://platform-lookaside.fbsbx.com/p.jpg" } }
        })))
        .mount(&mock)
        .await;

    let server = TestServer::with_mock_provider(&mock.uri()).await;
    let response = callback(&server, "facebook", "fb-code").await;
    assert_eq!(location(&response), "/");

    let requests = mock.received_requests().await.expect("request recording");
    let profile_request = requests
        .iter()
        .find(|request| request.url.path() == "/me")
        .expect("profile requested");
    assert!(
        profile_request
            .url
            .query_pairs()
            .any(|(key, value)| key == "appsecret_proof" && value.len() == 64)
    );

    let user = server
        .state
        .db
        .find_user_by_provider(Provider::Facebook, "10157")
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(
        user.avatar_url.as_deref(),
        Some("https://platform-lookaside.fbsbx.com/p.jpg")
    );
}

#[tokio::test]
async fn test_rejected_code_flashes_failure() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&mock)
        .await;

    let server = TestServer::with_mock_provider(&mock.uri()).await;
    let response = callback(&server, "github", "stale").await;

    assert_eq!(location(&response), "/login");
    assert!(set_cookie_value(&response, "session").is_none());
    let flash = set_cookie_value(&response, "flash").expect("flash cookie");

    let body = server
        .client
        .get(server.url("/login"))
        .header("Cookie", format!("flash={flash}"))
        .send()
        .await
        .expect("request succeeds")
        .text()
        .await
        .expect("response body");
    assert!(body.contains("Could not sign in with GitHub."));
    assert_eq!(server.state.db.count_users(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_profile_error_flashes_failure() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.token"
        })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/userinfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock)
        .await;

    let server = TestServer::with_mock_provider(&mock.uri()).await;
    let response = callback(&server, "google", "code").await;

    assert_eq!(location(&response), "/login");
    assert!(set_cookie_value(&response, "flash").is_some());
    assert_eq!(server.state.db.count_users(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_blank_profile_id_flashes_failure() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_abc"
        })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "   " })))
        .mount(&mock)
        .await;

    let server = TestServer::with_mock_provider(&mock.uri()).await;
    let response = callback(&server, "github", "code").await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
    assert!(set_cookie_value(&response, "flash").is_some());
    assert_eq!(server.state.db.count_users(None).await.unwrap(), 0);
}
