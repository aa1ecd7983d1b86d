//! E2E tests for health, metrics and static files

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_metrics_exposes_user_gauge() {
    let server = TestServer::new().await;
    server
        .state
        .identities
        .resolve(socialgate::data::Provider::GitHub, "1", None, None)
        .await
        .unwrap();

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("socialgate_users"));
    assert!(body.contains("socialgate_users_created_total"));
}

#[tokio::test]
async fn test_static_stylesheet_is_served() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/style.css"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("margin"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/nope.txt"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 404);
}
