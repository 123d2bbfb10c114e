//! Normalized identity record produced by every provider.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{Map, Value};

use super::token::OAuth2Token;
use crate::error::{missing_field, Error};

/// A user identity as asserted by an external provider, independent of which
/// provider produced it.
///
/// Handed to the application's session layer; this crate keeps no copy.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    /// The provider's raw claims or userinfo attributes, unrecognized fields included.
    pub raw_user: Map<String, Value>,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Start a user record carrying the credentials of `token`.
    pub fn from_token(token: &OAuth2Token, raw_user: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            username: String::new(),
            name: String::new(),
            email: String::new(),
            avatar_url: String::new(),
            raw_user,
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expiry: token.expiry,
        }
    }

    /// Apply the documented fallbacks and reject incomplete records.
    ///
    /// `id` and `email` must be present. A missing username falls back to the
    /// email address and a missing display name falls back to the username.
    pub fn normalized(mut self) -> Result<Self, Error> {
        if self.id.trim().is_empty() {
            return Err(missing_field("id"));
        }
        if self.email.trim().is_empty() {
            return Err(missing_field("email"));
        }
        if self.username.trim().is_empty() {
            self.username = self.email.clone();
        }
        if self.name.trim().is_empty() {
            self.name = self.username.clone();
        }
        Ok(self)
    }
}
