//! Zoho accounts, identified through the OIDC ID token.
//!
//! Zoho advertises OIDC but its userinfo endpoint
//! (`https://accounts.zoho.com/oauth/v2/userinfo`) does not work, so the user is
//! read from the `id_token` returned by the token endpoint instead.
//!
//! API reference: <https://www.zoho.com/accounts/protocol/oauth/sign-in-using-zoho.html>

use async_trait::async_trait;
use log::*;

use crate::error::{missing_field, Error};
use crate::http::HttpClient;
use crate::oauth::claims::{decode_unverified, verified_email, IssuerPolicy};
use crate::oauth::provider::{IdentityStrategy, Provider, ProviderConfig};
use crate::oauth::token::OAuth2Token;
use crate::oauth::user::AuthUser;

pub const NAME: &str = "zoho";

const AUTH_URL: &str = "https://accounts.zoho.com/oauth/v2/auth";
const TOKEN_URL: &str = "https://accounts.zoho.com/oauth/v2/token";

/// Regional Zoho account domains allowed to issue ID tokens.
pub const ISSUERS: IssuerPolicy = IssuerPolicy::new(&[
    "https://accounts.zoho.com.au",
    "https://accounts.zohocloud.ca",
    "https://accounts.zoho.eu",
    "https://accounts.zoho.com",
    "https://accounts.zoho.in",
    "https://accounts.zoho.jp",
    "https://accounts.zoho.sa",
    "https://accounts.zoho.uk",
    "https://accounts.zoho.com.cn",
]);

/// Build a Zoho provider with its fixed defaults and no credentials.
pub fn new_provider(http: HttpClient) -> Provider {
    let config = ProviderConfig::new("Zoho", AUTH_URL, TOKEN_URL)
        .with_scopes(&["profile", "email", "openid"])
        .with_pkce(true);
    Provider::new(NAME, config, http, ZohoIdToken)
}

/// Reads the user from the unverified ID token after issuer and audience checks.
pub struct ZohoIdToken;

#[async_trait]
impl IdentityStrategy for ZohoIdToken {
    fn uses_id_token(&self) -> bool {
        true
    }

    async fn fetch_auth_user(
        &self,
        provider: &Provider,
        token: &OAuth2Token,
    ) -> Result<AuthUser, Error> {
        let raw_id_token = token.id_token().ok_or_else(|| {
            warn!("Zoho token response carried no id_token");
            missing_field("id_token")
        })?;

        // The token came straight from Zoho's token endpoint over TLS; see
        // `decode_unverified` for why the signature is not checked here.
        let claims = decode_unverified(raw_id_token)?;
        ISSUERS.validate(&claims, provider.client_id())?;

        let email = verified_email(&claims, "email", "email_verified")?.to_string();

        let mut user = AuthUser::from_token(token, claims.as_map().clone());
        user.id = claims.require_id("sub")?;
        // Zoho has no username concept.
        user.username = email.clone();
        user.name = claims.optional_str("name")?.unwrap_or_default().to_string();
        user.avatar_url = claims
            .optional_str("picture")?
            .unwrap_or_default()
            .to_string();
        user.email = email;

        Ok(user)
    }
}
