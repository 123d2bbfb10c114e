//! GitHub accounts via the REST API.
//!
//! `/user` only exposes the public profile email, which is often null. In that
//! case the primary verified address is taken from `/user/emails`.

use async_trait::async_trait;
use log::*;
use serde::Deserialize;

use crate::error::{claims_decode_error, missing_field, ClaimsDecodeErrorKind, Error};
use crate::http::HttpClient;
use crate::oauth::provider::{IdentityStrategy, Provider, ProviderConfig};
use crate::oauth::token::OAuth2Token;
use crate::oauth::user::AuthUser;

pub const NAME: &str = "github";

const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_INFO_URL: &str = "https://api.github.com/user";

pub fn new_provider(http: HttpClient) -> Provider {
    let config = ProviderConfig::new("GitHub", AUTH_URL, TOKEN_URL)
        .with_scopes(&["read:user", "user:email"])
        .with_user_info_url(USER_INFO_URL)
        .with_pkce(true);
    Provider::new(NAME, config, http, GitHubUserInfo)
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    verified: bool,
    primary: bool,
}

pub struct GitHubUserInfo;

impl GitHubUserInfo {
    async fn primary_verified_email(
        &self,
        provider: &Provider,
        user_info_url: &str,
        token: &OAuth2Token,
    ) -> Result<String, Error> {
        let url = format!("{}/emails", user_info_url.trim_end_matches('/'));
        let emails: Vec<GitHubEmail> =
            serde_json::from_value(provider.get_json(&url, token).await?).map_err(|e| {
                claims_decode_error(
                    ClaimsDecodeErrorKind::MalformedPayload,
                    &format!("unexpected GitHub emails payload: {}", e),
                )
            })?;

        emails
            .into_iter()
            .find(|email| email.primary && email.verified)
            .map(|email| email.email)
            .ok_or_else(|| {
                warn!("GitHub account has no primary verified email");
                missing_field("email")
            })
    }
}

#[async_trait]
impl IdentityStrategy for GitHubUserInfo {
    async fn fetch_auth_user(
        &self,
        provider: &Provider,
        token: &OAuth2Token,
    ) -> Result<AuthUser, Error> {
        let claims = provider.fetch_user_info(token).await?;

        let email = match claims.optional_str("email")? {
            Some(email) => email.to_string(),
            None => {
                debug!("GitHub profile email is private, reading /user/emails");
                let user_info_url = provider.user_info_url().unwrap_or(USER_INFO_URL);
                self.primary_verified_email(provider, user_info_url, token)
                    .await?
            }
        };

        let mut user = AuthUser::from_token(token, claims.as_map().clone());
        user.id = claims.require_id("id")?;
        user.username = claims.optional_str("login")?.unwrap_or_default().to_string();
        user.name = claims.optional_str("name")?.unwrap_or_default().to_string();
        user.avatar_url = claims
            .optional_str("avatar_url")?
            .unwrap_or_default()
            .to_string();
        user.email = email;
        Ok(user)
    }
}
