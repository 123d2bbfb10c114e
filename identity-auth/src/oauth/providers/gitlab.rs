//! GitLab.com accounts via the REST API.

use async_trait::async_trait;

use crate::error::Error;
use crate::http::HttpClient;
use crate::oauth::provider::{IdentityStrategy, Provider, ProviderConfig};
use crate::oauth::token::OAuth2Token;
use crate::oauth::user::AuthUser;

pub const NAME: &str = "gitlab";

const AUTH_URL: &str = "https://gitlab.com/oauth/authorize";
const TOKEN_URL: &str = "https://gitlab.com/oauth/token";
const USER_INFO_URL: &str = "https://gitlab.com/api/v4/user";

pub fn new_provider(http: HttpClient) -> Provider {
    let config = ProviderConfig::new("GitLab", AUTH_URL, TOKEN_URL)
        .with_scopes(&["read_user"])
        .with_user_info_url(USER_INFO_URL)
        .with_pkce(true);
    Provider::new(NAME, config, http, GitLabUserInfo)
}

pub struct GitLabUserInfo;

#[async_trait]
impl IdentityStrategy for GitLabUserInfo {
    async fn fetch_auth_user(
        &self,
        provider: &Provider,
        token: &OAuth2Token,
    ) -> Result<AuthUser, Error> {
        let claims = provider.fetch_user_info(token).await?;

        let mut user = AuthUser::from_token(token, claims.as_map().clone());
        user.id = claims.require_id("id")?;
        user.username = claims
            .optional_str("username")?
            .unwrap_or_default()
            .to_string();
        user.name = claims.optional_str("name")?.unwrap_or_default().to_string();
        user.email = claims.require_str("email")?.to_string();
        user.avatar_url = claims
            .optional_str("avatar_url")?
            .unwrap_or_default()
            .to_string();
        Ok(user)
    }
}
