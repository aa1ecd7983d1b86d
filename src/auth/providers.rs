//! Identity provider adapters
//!
//! Each supported provider is one variant of [`ProviderAdapter`], carrying
//! its OAuth client credentials. The adapter builds the authorization
//! redirect, exchanges the callback code for an access token, fetches the
//! provider profile and hands the extracted identity to the
//! [`IdentityService`].

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use url::Url;

use crate::config::{ProviderOAuthConfig, ProvidersConfig};
use crate::data::{Provider, User};
use crate::error::AppError;
use crate::service::IdentityService;

/// Endpoints and default scopes of one provider
struct ProviderEndpoints {
    authorize: &'static str,
    token: &'static str,
    userinfo: &'static str,
    scopes: &'static [&'static str],
    scope_joiner: &'static str,
}

const GITHUB: ProviderEndpoints = ProviderEndpoints {
    authorize: "https://github.com/login/oauth/authorize",
    token: "https://github.com/login/oauth/access_token",
    userinfo: "https://api.github.com/user",
    scopes: &[],
    scope_joiner: " ",
};

const GOOGLE: ProviderEndpoints = ProviderEndpoints {
    authorize: "https://accounts.google.com/o/oauth2/v2/auth",
    token: "https://oauth2.googleapis.com/token",
    userinfo: "https://www.googleapis.com/oauth2/v3/userinfo",
    scopes: &["profile"],
    scope_joiner: " ",
};

const FACEBOOK: ProviderEndpoints = ProviderEndpoints {
    authorize: "https://www.facebook.com/v3.2/dialog/oauth",
    token: "https://graph.facebook.com/v3.2/oauth/access_token",
    userinfo: "https://graph.facebook.com/v3.2/me?fields=id,name,picture.type(large),email",
    scopes: &["public_profile", "manage_pages"],
    scope_joiner: ",",
};

fn endpoints(provider: Provider) -> &'static ProviderEndpoints {
    match provider {
        Provider::GitHub => &GITHUB,
        Provider::Google => &GOOGLE,
        Provider::Facebook => &FACEBOOK,
    }
}

/// OAuth client registration with resolved endpoints
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl ProviderCredentials {
    fn from_config(provider: Provider, config: &ProviderOAuthConfig) -> Self {
        let defaults = endpoints(provider);
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            authorize_url: config
                .authorize_url
                .clone()
                .unwrap_or_else(|| defaults.authorize.to_string()),
            token_url: config
                .token_url
                .clone()
                .unwrap_or_else(|| defaults.token.to_string()),
            userinfo_url: config
                .userinfo_url
                .clone()
                .unwrap_or_else(|| defaults.userinfo.to_string()),
        }
    }
}

/// Profile returned by a provider, reduced to what we store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Provider-scoped user id
    pub id: String,
    pub display_name: Option<String>,
    /// Photo URLs, best first
    pub photos: Vec<String>,
}

impl ProviderProfile {
    /// First photo, if the provider sent any
    pub fn avatar_url(&self) -> Option<String> {
        self.photos.first().cloned()
    }
}

/// Result of a provider callback
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// The provider vouched for the user and the identity was resolved
    Success(User),
    /// The provider rejected the login; the reason is shown to the user
    Failure(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// A configured identity provider
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    GitHub(ProviderCredentials),
    Google(ProviderCredentials),
    Facebook(ProviderCredentials),
}

impl ProviderAdapter {
    /// Build the adapter for `provider` from its configuration
    pub fn new(provider: Provider, config: &ProviderOAuthConfig) -> Self {
        let credentials = ProviderCredentials::from_config(provider, config);
        match provider {
            Provider::GitHub => ProviderAdapter::GitHub(credentials),
            Provider::Google => ProviderAdapter::Google(credentials),
            Provider::Facebook => ProviderAdapter::Facebook(credentials),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ProviderAdapter::GitHub(_) => Provider::GitHub,
            ProviderAdapter::Google(_) => Provider::Google,
            ProviderAdapter::Facebook(_) => Provider::Facebook,
        }
    }

    pub fn credentials(&self) -> &ProviderCredentials {
        match self {
            ProviderAdapter::GitHub(credentials)
            | ProviderAdapter::Google(credentials)
            | ProviderAdapter::Facebook(credentials) => credentials,
        }
    }

    /// Scopes requested on the authorization redirect
    pub fn scopes(&self) -> &'static [&'static str] {
        endpoints(self.provider()).scopes
    }

    /// URL to send the browser to, carrying `state` for CSRF protection
    pub fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        let credentials = self.credentials();
        let mut url = Url::parse(&credentials.authorize_url).map_err(|e| {
            AppError::Config(format!("invalid authorize URL for {}: {e}", self.provider()))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &credentials.client_id)
                .append_pair("redirect_uri", &credentials.callback_url)
                .append_pair("state", state);
            let scopes = self.scopes();
            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.join(endpoints(self.provider()).scope_joiner));
            }
        }

        Ok(url)
    }

    /// Extract the identity fields from the provider's profile JSON
    pub fn extract_profile(&self, data: &serde_json::Value) -> Result<ProviderProfile, AppError> {
        let (id, display_name, photo) = match self {
            ProviderAdapter::GitHub(_) => (
                json_string(data.get("id")),
                json_string(data.get("name")).or_else(|| json_string(data.get("login"))),
                json_string(data.get("avatar_url")),
            ),
            ProviderAdapter::Google(_) => (
                json_string(data.get("sub")).or_else(|| json_string(data.get("id"))),
                json_string(data.get("name")),
                json_string(data.get("picture")),
            ),
            ProviderAdapter::Facebook(_) => (
                json_string(data.get("id")),
                json_string(data.get("name")),
                json_string(data.pointer("/picture/data/url")),
            ),
        };

        let id = id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Provider(format!("{} profile has no id", self.provider())))?;

        Ok(ProviderProfile {
            id,
            display_name,
            photos: photo.into_iter().collect(),
        })
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<String, AppError> {
        let credentials = self.credentials();
        let response = http
            .post(&credentials.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("redirect_uri", credentials.callback_url.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: TokenResponse = response.json().await?;

        if let Some(error) = body.error {
            let description = body.error_description.unwrap_or_default();
            return Err(AppError::Provider(
                format!("token exchange rejected: {error} {description}")
                    .trim_end()
                    .to_string(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::Provider(format!(
                "token endpoint returned {status}"
            )));
        }

        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Provider("token response has no access_token".to_string()))
    }

    /// Fetch the signed-in user's profile
    pub async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<ProviderProfile, AppError> {
        let credentials = self.credentials();
        let mut url = Url::parse(&credentials.userinfo_url).map_err(|e| {
            AppError::Config(format!("invalid userinfo URL for {}: {e}", self.provider()))
        })?;

        if let ProviderAdapter::Facebook(_) = self {
            let proof = appsecret_proof(&credentials.client_secret, access_token)?;
            url.query_pairs_mut().append_pair("appsecret_proof", &proof);
        }

        let mut request = http.get(url).bearer_auth(access_token);
        if let ProviderAdapter::GitHub(_) = self {
            request = request.header(reqwest::header::ACCEPT, "application/vnd.github+json");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Provider(format!(
                "profile endpoint returned {status}"
            )));
        }

        let data: serde_json::Value = response.json().await?;
        self.extract_profile(&data)
    }

    /// Complete a callback: exchange the code, fetch the profile and
    /// resolve the local user.
    ///
    /// Provider-side problems become [`AuthOutcome::Failure`]; store
    /// errors from the identity service propagate.
    pub async fn authenticate(
        &self,
        http: &reqwest::Client,
        identities: &IdentityService,
        code: &str,
    ) -> Result<AuthOutcome, AppError> {
        let provider = self.provider();

        let access_token = match self.exchange_code(http, code).await {
            Ok(token) => token,
            Err(error) => return Ok(provider_failure(provider, error)),
        };
        let profile = match self.fetch_profile(http, &access_token).await {
            Ok(profile) => profile,
            Err(error) => return Ok(provider_failure(provider, error)),
        };

        let user = identities
            .resolve(
                provider,
                &profile.id,
                Some(access_token),
                profile.avatar_url(),
            )
            .await?;

        Ok(AuthOutcome::Success(user))
    }
}

fn provider_failure(provider: Provider, error: AppError) -> AuthOutcome {
    tracing::warn!(provider = %provider, %error, "Provider authentication failed");
    AuthOutcome::Failure(format!(
        "Could not sign in with {}.",
        provider.display_name()
    ))
}

/// Render a JSON scalar as a string; ids may be numbers
fn json_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Facebook's `appsecret_proof`: hex HMAC-SHA256 of the token keyed by the app secret
fn appsecret_proof(client_secret: &str, access_token: &str) -> Result<String, AppError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(client_secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(access_token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// The providers that have credentials configured
#[derive(Debug, Clone, Default)]
pub struct Providers {
    github: Option<ProviderAdapter>,
    google: Option<ProviderAdapter>,
    facebook: Option<ProviderAdapter>,
}

impl Providers {
    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self {
            github: config
                .github
                .as_ref()
                .map(|c| ProviderAdapter::new(Provider::GitHub, c)),
            google: config
                .google
                .as_ref()
                .map(|c| ProviderAdapter::new(Provider::Google, c)),
            facebook: config
                .facebook
                .as_ref()
                .map(|c| ProviderAdapter::new(Provider::Facebook, c)),
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderAdapter> {
        match provider {
            Provider::GitHub => self.github.as_ref(),
            Provider::Google => self.google.as_ref(),
            Provider::Facebook => self.facebook.as_ref(),
        }
    }

    /// Configured providers in display order
    pub fn enabled(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|provider| self.get(*provider).is_some())
            .collect()
    }
}
