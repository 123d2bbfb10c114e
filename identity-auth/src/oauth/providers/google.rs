//! Google accounts via the OpenID Connect userinfo endpoint.

use async_trait::async_trait;

use crate::error::Error;
use crate::http::HttpClient;
use crate::oauth::claims::verified_email;
use crate::oauth::provider::{IdentityStrategy, Provider, ProviderConfig};
use crate::oauth::token::OAuth2Token;
use crate::oauth::user::AuthUser;

pub const NAME: &str = "google";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

pub fn new_provider(http: HttpClient) -> Provider {
    let config = ProviderConfig::new("Google", AUTH_URL, TOKEN_URL)
        .with_scopes(&[
            "https://www.googleapis.com/auth/userinfo.profile",
            "https://www.googleapis.com/auth/userinfo.email",
        ])
        .with_user_info_url(USER_INFO_URL)
        .with_pkce(true);
    Provider::new(NAME, config, http, GoogleUserInfo)
}

pub struct GoogleUserInfo;

#[async_trait]
impl IdentityStrategy for GoogleUserInfo {
    async fn fetch_auth_user(
        &self,
        provider: &Provider,
        token: &OAuth2Token,
    ) -> Result<AuthUser, Error> {
        let claims = provider.fetch_user_info(token).await?;
        let email = verified_email(&claims, "email", "email_verified")?.to_string();

        let mut user = AuthUser::from_token(token, claims.as_map().clone());
        user.id = claims.require_id("sub")?;
        user.name = claims.optional_str("name")?.unwrap_or_default().to_string();
        user.avatar_url = claims
            .optional_str("picture")?
            .unwrap_or_default()
            .to_string();
        user.username = email.clone();
        user.email = email;
        Ok(user)
    }
}
