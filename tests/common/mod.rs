//! Common test utilities for E2E tests

#![allow(dead_code)]

use socialgate::auth::session::{Session, create_session_token};
use socialgate::data::Provider;
use socialgate::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    /// Client that does not follow redirects
    pub client: reqwest::Client,
}

fn provider_config(provider: Provider, mock_uri: Option<&str>) -> config::ProviderOAuthConfig {
    let (token_path, userinfo_path) = match provider {
        Provider::GitHub => ("/login/oauth/access_token", "/user"),
        Provider::Google => ("/token", "/oauth2/v3/userinfo"),
        Provider::Facebook => ("/oauth/access_token", "/me?fields=id,name,picture"),
    };

    config::ProviderOAuthConfig {
        client_id: format!("{}-client-id", provider),
        client_secret: format!("{}-client-secret", provider),
        callback_url: format!("http://localhost/auth/{}/callback", provider),
        authorize_url: None,
        token_url: mock_uri.map(|uri| format!("{uri}{token_path}")),
        userinfo_url: mock_uri.map(|uri| format!("{uri}{userinfo_path}")),
    }
}

impl TestServer {
    /// Create a test server with every provider configured against the
    /// real provider endpoints
    pub async fn new() -> Self {
        Self::start(None, &Provider::ALL).await
    }

    /// Create a test server whose provider token and profile endpoints
    /// point at `mock_uri`
    pub async fn with_mock_provider(mock_uri: &str) -> Self {
        Self::start(Some(mock_uri), &Provider::ALL).await
    }

    /// Create a test server with only `providers` configured
    pub async fn start(mock_uri: Option<&str>, providers: &[Provider]) -> Self {
        socialgate::metrics::init_metrics();

        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let static_dir = temp_dir.path().join("public");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join("style.css"), "body { margin: 0; }").unwrap();

        let configured = |provider: Provider| {
            providers
                .contains(&provider)
                .then(|| provider_config(provider, mock_uri))
        };

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                static_dir,
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: SESSION_SECRET.to_string(),
                session_max_age: 3600,
            },
            providers: config::ProvidersConfig {
                github: configured(Provider::GitHub),
                google: configured(Provider::Google),
                facebook: configured(Provider::Facebook),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = socialgate::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Signed session cookie value naming `identity`
    pub fn session_token(&self, identity: &str) -> String {
        let now = chrono::Utc::now();
        let session = Session {
            identity: identity.to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        create_session_token(&session, SESSION_SECRET).unwrap()
    }
}

/// Value of the `name` cookie set by `response`, if any
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookie_header(response, name).map(|header| {
        header[name.len() + 1..]
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    })
}

/// Full `Set-Cookie` header for `name`, if any
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(ToString::to_string)
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}
