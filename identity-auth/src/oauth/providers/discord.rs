//! Discord accounts via the REST API.

use async_trait::async_trait;

use crate::error::Error;
use crate::http::HttpClient;
use crate::oauth::claims::verified_email;
use crate::oauth::provider::{IdentityStrategy, Provider, ProviderConfig};
use crate::oauth::token::OAuth2Token;
use crate::oauth::user::AuthUser;

pub const NAME: &str = "discord";

const AUTH_URL: &str = "https://discord.com/api/oauth2/authorize";
const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const USER_INFO_URL: &str = "https://discord.com/api/users/@me";
const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";

pub fn new_provider(http: HttpClient) -> Provider {
    let config = ProviderConfig::new("Discord", AUTH_URL, TOKEN_URL)
        .with_scopes(&["identify", "email"])
        .with_user_info_url(USER_INFO_URL)
        .with_pkce(true);
    Provider::new(NAME, config, http, DiscordUserInfo)
}

pub struct DiscordUserInfo;

#[async_trait]
impl IdentityStrategy for DiscordUserInfo {
    async fn fetch_auth_user(
        &self,
        provider: &Provider,
        token: &OAuth2Token,
    ) -> Result<AuthUser, Error> {
        let claims = provider.fetch_user_info(token).await?;
        let id = claims.require_id("id")?;
        let email = verified_email(&claims, "email", "verified")?.to_string();

        let mut user = AuthUser::from_token(token, claims.as_map().clone());
        user.username = claims
            .optional_str("username")?
            .unwrap_or_default()
            .to_string();
        user.name = claims
            .optional_str("global_name")?
            .unwrap_or_default()
            .to_string();
        // Discord only returns the avatar hash.
        if let Some(hash) = claims.optional_str("avatar")? {
            user.avatar_url = format!("{}/{}/{}.png", AVATAR_CDN, id, hash);
        }
        user.email = email;
        user.id = id;
        Ok(user)
    }
}
