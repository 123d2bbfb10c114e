//! OAuth token types.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::error::{token_exchange_error, Error, TokenExchangeErrorKind};

/// Raw OAuth2 token returned by a provider's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuth2Token {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: Option<SecretString>,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// When the access token expires.
    pub expiry: Option<DateTime<Utc>>,
    /// Provider-specific members of the token response, notably `id_token`.
    pub extra: Map<String, Value>,
}

impl OAuth2Token {
    /// Decode an RFC 6749 token response body.
    ///
    /// `expires_in` is accepted both as a number and as a numeric string since
    /// providers disagree on it. Unrecognized members are kept in `extra`.
    pub fn from_response(mut body: Map<String, Value>) -> Result<Self, Error> {
        let access_token = match body.remove("access_token") {
            Some(Value::String(token)) if !token.is_empty() => token,
            _ => {
                return Err(token_exchange_error(
                    TokenExchangeErrorKind::MalformedResponse,
                    "token response has no access_token",
                ))
            }
        };

        let refresh_token = match body.remove("refresh_token") {
            Some(Value::String(token)) if !token.is_empty() => Some(SecretString::new(token)),
            _ => None,
        };

        let token_type = match body.remove("token_type") {
            Some(Value::String(token_type)) => token_type,
            _ => "Bearer".to_string(),
        };

        let expiry = match expires_in(body.remove("expires_in")) {
            Some(seconds) if seconds > 0 => Some(
                Duration::try_seconds(seconds)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        token_exchange_error(
                            TokenExchangeErrorKind::MalformedResponse,
                            &format!("expires_in out of range: {}", seconds),
                        )
                    })?,
            ),
            _ => None,
        };

        Ok(Self {
            access_token: SecretString::new(access_token),
            refresh_token,
            token_type,
            expiry,
            extra: body,
        })
    }

    /// Look up a provider-specific member of the token response.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// The OIDC `id_token`, if the provider returned a non-empty one.
    pub fn id_token(&self) -> Option<&str> {
        self.extra("id_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Check if the access token is expired or about to expire soon.
    ///
    /// Returns true if the token is expired or will expire within 5 minutes.
    pub fn is_expired(&self) -> bool {
        self.expiry
            .map(|expires| expires <= Utc::now() + Duration::minutes(5))
            .unwrap_or(false)
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expiry.map(|expires| expires - Utc::now())
    }
}

/// Lifetime in whole seconds. Fractions are truncated; anything unparseable is ignored.
fn expires_in(value: Option<Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
