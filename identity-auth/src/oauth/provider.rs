//! Shared OAuth 2.0 authorization code flow and the per-provider strategy seam.
//!
//! Every provider is the same concrete [`Provider`] type: the flow (authorization
//! URL, code exchange, bearer GETs) lives here once, and each provider supplies
//! only its defaults plus an [`IdentityStrategy`] that turns a token into an
//! [`AuthUser`].

use std::fmt;

use async_trait::async_trait;
use log::*;
use rand::Rng;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use url::Url;

use super::claims::Claims;
use super::pkce::{PkceChallenge, PkceVerifier};
use super::token::OAuth2Token;
use super::user::AuthUser;
use crate::context::RequestContext;
use crate::error::{
    config_error, network_error, token_exchange_error, ClaimsDecodeErrorKind, ConfigErrorKind,
    Error, ErrorKind, NetworkErrorKind, TokenExchangeErrorKind,
};
use crate::http::HttpClient;

/// Configuration owned by a single provider instance.
///
/// Never shared across instances: the registry builds a fresh one per lookup.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub display_name: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    /// Absent for providers that read identity from an ID token.
    pub user_info_url: Option<String>,
    pub pkce: bool,
    pub context: RequestContext,
}

impl ProviderConfig {
    /// Create a configuration with the provider's fixed endpoints and no credentials.
    pub fn new(display_name: &str, auth_url: &str, token_url: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            client_id: String::new(),
            client_secret: SecretString::new(String::new()),
            redirect_url: String::new(),
            scopes: Vec::new(),
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            user_info_url: None,
            pkce: false,
            context: RequestContext::background(),
        }
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(|scope| scope.to_string()).collect();
        self
    }

    pub fn with_user_info_url(mut self, user_info_url: &str) -> Self {
        self.user_info_url = Some(user_info_url.to_string());
        self
    }

    pub fn with_pkce(mut self, pkce: bool) -> Self {
        self.pkce = pkce;
        self
    }
}

/// Per-attempt authorization data.
///
/// Belongs to the caller (e.g. a short-lived session), never to the provider
/// instance, which may serve many concurrent login attempts.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: Url,
    /// CSRF state parameter for validation.
    pub state: String,
    /// PKCE verifier to be kept for the code exchange.
    pub pkce_verifier: Option<PkceVerifier>,
}

/// The part of a provider that differs between identity providers: turning a
/// token response into a normalized user.
#[async_trait]
pub trait IdentityStrategy: Send + Sync {
    /// True when identity is read from an ID token instead of a userinfo endpoint.
    fn uses_id_token(&self) -> bool {
        false
    }

    /// Build the user record. The result is normalized by [`Provider::fetch_auth_user`].
    async fn fetch_auth_user(
        &self,
        provider: &Provider,
        token: &OAuth2Token,
    ) -> Result<AuthUser, Error>;
}

/// An external identity provider: shared authorization code flow plus a strategy.
pub struct Provider {
    name: String,
    config: ProviderConfig,
    http: HttpClient,
    strategy: Box<dyn IdentityStrategy>,
}

impl Provider {
    pub fn new<S>(name: &str, config: ProviderConfig, http: HttpClient, strategy: S) -> Self
    where
        S: IdentityStrategy + 'static,
    {
        Self {
            name: name.to_string(),
            config,
            http,
            strategy: Box::new(strategy),
        }
    }

    /// Stable lowercase registry name, e.g. `"zoho"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.config.display_name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.config.client_id = client_id.into();
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.config.client_secret
    }

    pub fn set_client_secret(&mut self, client_secret: SecretString) {
        self.config.client_secret = client_secret;
    }

    pub fn redirect_url(&self) -> &str {
        &self.config.redirect_url
    }

    pub fn set_redirect_url(&mut self, redirect_url: impl Into<String>) {
        self.config.redirect_url = redirect_url.into();
    }

    pub fn scopes(&self) -> &[String] {
        &self.config.scopes
    }

    pub fn set_scopes(&mut self, scopes: Vec<String>) {
        self.config.scopes = scopes;
    }

    /// Whether this provider requires PKCE. Fixed by the provider defaults.
    pub fn pkce(&self) -> bool {
        self.config.pkce
    }

    pub fn auth_url(&self) -> &str {
        &self.config.auth_url
    }

    pub fn set_auth_url(&mut self, auth_url: impl Into<String>) {
        self.config.auth_url = auth_url.into();
    }

    pub fn token_url(&self) -> &str {
        &self.config.token_url
    }

    pub fn set_token_url(&mut self, token_url: impl Into<String>) {
        self.config.token_url = token_url.into();
    }

    pub fn user_info_url(&self) -> Option<&str> {
        self.config.user_info_url.as_deref()
    }

    pub fn set_user_info_url(&mut self, user_info_url: impl Into<String>) {
        self.config.user_info_url = Some(user_info_url.into());
    }

    pub fn context(&self) -> &RequestContext {
        &self.config.context
    }

    /// Bound every network call of this instance by the caller's context.
    pub fn set_context(&mut self, context: RequestContext) {
        self.config.context = context;
    }

    pub fn uses_id_token(&self) -> bool {
        self.strategy.uses_id_token()
    }

    /// Start a login attempt: a fresh state, a PKCE verifier when enabled, and the URL.
    ///
    /// The returned request must be kept by the caller until the callback arrives.
    pub fn authorization_request(&self) -> Result<AuthorizationRequest, Error> {
        let state = generate_state();
        let pkce_verifier = self.config.pkce.then(PkceVerifier::generate);
        let challenge = pkce_verifier.as_ref().map(PkceVerifier::challenge);
        let url = self.build_auth_url(&state, challenge.as_ref())?;

        Ok(AuthorizationRequest {
            url,
            state,
            pkce_verifier,
        })
    }

    /// Build the authorization URL for `state`.
    ///
    /// A code challenge is required when PKCE is enabled and ignored otherwise.
    pub fn build_auth_url(
        &self,
        state: &str,
        code_challenge: Option<&PkceChallenge>,
    ) -> Result<Url, Error> {
        self.require_client_id()?;
        self.require_redirect_url()?;

        let challenge = match (self.config.pkce, code_challenge) {
            (true, Some(challenge)) => Some(challenge),
            (true, None) => {
                return Err(config_error(
                    ConfigErrorKind::MissingCodeChallenge,
                    &format!("{} requires a PKCE code challenge", self.name),
                ))
            }
            (false, Some(_)) => {
                debug!("{} does not use PKCE, ignoring code challenge", self.name);
                None
            }
            (false, None) => None,
        };

        let mut url = Url::parse(&self.config.auth_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Config(ConfigErrorKind::InvalidUrl),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_url);
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
            query.append_pair("state", state);
            if let Some(challenge) = challenge {
                query
                    .append_pair("code_challenge", challenge.as_str())
                    .append_pair("code_challenge_method", challenge.method());
            }
        }

        Ok(url)
    }

    /// Exchange an authorization code for a token at the provider's token endpoint.
    ///
    /// `code_verifier` must be the exact verifier whose challenge went into the
    /// authorization URL. Failures are returned immediately and never retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&PkceVerifier>,
    ) -> Result<OAuth2Token, Error> {
        self.require_client_id()?;
        self.require_client_secret()?;
        self.require_redirect_url()?;

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
        ];
        match code_verifier {
            Some(verifier) => form.push(("code_verifier", verifier.as_str())),
            None if self.config.pkce => {
                warn!("{} uses PKCE but no code verifier was supplied", self.name)
            }
            None => {}
        }

        debug!("Exchanging {} authorization code for tokens", self.name);

        let request = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&form);

        let (status, body) = self
            .config
            .context
            .run(async {
                let response = request.send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, Error>((status, body))
            })
            .await?;

        if !status.is_success() {
            warn!(
                "{} token endpoint returned {} ({})",
                self.name,
                status,
                oauth_error_code(&body).unwrap_or_else(|| "no error code".to_string())
            );
            return Err(token_exchange_error(
                TokenExchangeErrorKind::Rejected,
                &format!("token endpoint returned {}: {}", status, body),
            ));
        }

        let body: Map<String, Value> = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse {} token response: {:?}", self.name, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::TokenExchange(TokenExchangeErrorKind::MalformedResponse),
            }
        })?;

        // Some providers answer a failed exchange with 200 and an OAuth2 error body.
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            let description = body
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            warn!("{} rejected the code exchange: {}", self.name, error);
            return Err(token_exchange_error(
                TokenExchangeErrorKind::Rejected,
                &format!("{}: {}", error, description),
            ));
        }

        let token = OAuth2Token::from_response(body)?;
        info!("Successfully exchanged {} authorization code for tokens", self.name);
        Ok(token)
    }

    /// GET the provider's userinfo endpoint with the access token as bearer credential.
    pub async fn fetch_user_info(&self, token: &OAuth2Token) -> Result<Claims, Error> {
        let user_info_url = self.config.user_info_url.as_deref().ok_or_else(|| {
            config_error(
                ConfigErrorKind::MissingEndpoint,
                &format!("{} has no userinfo endpoint", self.name),
            )
        })?;

        Claims::from_value(self.get_json(user_info_url, token).await?)
    }

    /// GET any provider resource as JSON, authenticated with the access token.
    pub async fn get_json(&self, url: &str, token: &OAuth2Token) -> Result<Value, Error> {
        let request = self
            .http
            .get(url)
            .bearer_auth(token.access_token())
            .header(ACCEPT, "application/json");

        let (status, body) = self
            .config
            .context
            .run(async {
                let response = request.send().await?;
                let status = response.status();
                let body = response.bytes().await?;
                Ok::<_, Error>((status, body))
            })
            .await?;

        if !status.is_success() {
            warn!("{} resource {} returned {}", self.name, url, status);
            return Err(status_error(status, url));
        }

        serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to parse {} response from {}: {:?}", self.name, url, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::ClaimsDecode(ClaimsDecodeErrorKind::MalformedPayload),
            }
        })
    }

    /// Resolve the normalized user for `token`.
    ///
    /// All-or-nothing: any failure aborts the attempt and no partial user is returned.
    pub async fn fetch_auth_user(&self, token: &OAuth2Token) -> Result<AuthUser, Error> {
        let user = self
            .strategy
            .fetch_auth_user(self, token)
            .await?
            .normalized()?;

        info!("Fetched {} identity for user {}", self.name, user.id);
        Ok(user)
    }

    fn require_client_id(&self) -> Result<(), Error> {
        self.require_credential(self.config.client_id.is_empty(), "client id")
    }

    fn require_client_secret(&self) -> Result<(), Error> {
        self.require_credential(
            self.config.client_secret.expose_secret().is_empty(),
            "client secret",
        )
    }

    fn require_redirect_url(&self) -> Result<(), Error> {
        self.require_credential(self.config.redirect_url.is_empty(), "redirect url")
    }

    fn require_credential(&self, missing: bool, what: &str) -> Result<(), Error> {
        if missing {
            return Err(config_error(
                ConfigErrorKind::MissingCredential,
                &format!("{} {} is not configured", self.name, what),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Generate a cryptographically random state token.
pub fn generate_state() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(random_bytes)
}

/// The OAuth2 `error` code of a token endpoint body, if it is JSON and carries one.
fn oauth_error_code(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

fn status_error(status: StatusCode, url: &str) -> Error {
    network_error(
        NetworkErrorKind::Status(status.as_u16()),
        &format!("{} returned {}", url, status),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::http::HttpClientBuilder;

    pub(crate) fn http_client() -> HttpClient {
        HttpClientBuilder::new()
            .with_request_logging(false)
            .build()
            .unwrap()
    }

    /// Maps a plain OIDC-style userinfo document.
    pub(crate) struct UserInfoStrategy;

    #[async_trait]
    impl IdentityStrategy for UserInfoStrategy {
        async fn fetch_auth_user(
            &self,
            provider: &Provider,
            token: &OAuth2Token,
        ) -> Result<AuthUser, Error> {
            let claims = provider.fetch_user_info(token).await?;
            let mut user = AuthUser::from_token(token, claims.as_map().clone());
            user.id = claims.require_id("sub")?;
            user.email = claims.require_str("email")?.to_string();
            Ok(user)
        }
    }

    pub(crate) fn provider(server_url: &str, pkce: bool) -> Provider {
        let config = ProviderConfig::new(
            "Test",
            &format!("{}/authorize", server_url),
            &format!("{}/token", server_url),
        )
        .with_scopes(&["openid", "email"])
        .with_user_info_url(&format!("{}/userinfo", server_url))
        .with_pkce(pkce);

        let mut provider = Provider::new("test", config, http_client(), UserInfoStrategy);
        provider.set_client_id("client-123");
        provider.set_client_secret(SecretString::new("secret-456".to_string()));
        provider.set_redirect_url("https://app.example.com/callback");
        provider
    }

    pub(crate) fn token(access_token: &str) -> OAuth2Token {
        let body = serde_json::json!({ "access_token": access_token, "expires_in": 3600 });
        OAuth2Token::from_response(body.as_object().cloned().unwrap()).unwrap()
    }
}
