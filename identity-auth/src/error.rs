//! Error types for the `identity-auth` crate.
//!
//! Follows the same pattern as the rest of the workspace: a root Error struct holding
//! an error kind and an optional source for chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for identity-auth.
///
/// Every failure aborts the current login attempt. Nothing in this crate retries.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors surfaced to callers.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    Network(NetworkErrorKind),
    TokenExchange(TokenExchangeErrorKind),
    ClaimsDecode(ClaimsDecodeErrorKind),
    ClaimsValidation(ClaimsValidationErrorKind),
    /// A required claim or token field was absent. Holds the field name.
    MissingField(String),
}

/// Errors caused by provider configuration or registry lookups.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    UnknownProvider,
    MissingCredential,
    MissingCodeChallenge,
    MissingEndpoint,
    InvalidUrl,
}

/// Errors from outbound HTTP calls.
#[derive(Debug, PartialEq)]
pub enum NetworkErrorKind {
    Transport,
    Timeout,
    Cancelled,
    /// Non-2xx status returned by a provider resource.
    Status(u16),
}

/// Errors from the authorization code exchange.
#[derive(Debug, PartialEq)]
pub enum TokenExchangeErrorKind {
    Rejected,
    MalformedResponse,
}

/// Errors decoding an ID token or a claims payload.
#[derive(Debug, PartialEq)]
pub enum ClaimsDecodeErrorKind {
    MalformedToken,
    MalformedPayload,
    UnexpectedType,
}

/// Errors validating decoded claims.
#[derive(Debug, PartialEq)]
pub enum ClaimsValidationErrorKind {
    InvalidIssuer,
    InvalidAudience,
    UnverifiedEmail,
}

impl Error {
    /// Returns true if the error was caused by the caller cancelling the request context.
    pub fn is_cancelled(&self) -> bool {
        self.error_kind == ErrorKind::Network(NetworkErrorKind::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Config(kind) => write!(f, "Configuration error: {:?}", kind)?,
            ErrorKind::Network(kind) => write!(f, "Network error: {:?}", kind)?,
            ErrorKind::TokenExchange(kind) => write!(f, "Token exchange error: {:?}", kind)?,
            ErrorKind::ClaimsDecode(kind) => write!(f, "Claims decode error: {:?}", kind)?,
            ErrorKind::ClaimsValidation(kind) => {
                write!(f, "Claims validation error: {:?}", kind)?
            }
            ErrorKind::MissingField(field) => write!(f, "Missing field: {}", field)?,
        }
        match &self.source {
            Some(source) => write!(f, " ({})", source),
            None => Ok(()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_timeout() {
            ErrorKind::Network(NetworkErrorKind::Timeout)
        } else if err.is_builder() {
            ErrorKind::Config(ConfigErrorKind::InvalidUrl)
        } else {
            ErrorKind::Network(NetworkErrorKind::Transport)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => Error {
                source: Some(err.into()),
                error_kind: ErrorKind::Network(NetworkErrorKind::Transport),
            },
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}

/// Helper function to create network errors.
pub fn network_error(kind: NetworkErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Network(kind),
    }
}

/// Helper function to create token exchange errors.
pub fn token_exchange_error(kind: TokenExchangeErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::TokenExchange(kind),
    }
}

/// Helper function to create claims decode errors.
pub fn claims_decode_error(kind: ClaimsDecodeErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::ClaimsDecode(kind),
    }
}

/// Helper function to create claims validation errors.
pub fn claims_validation_error(kind: ClaimsValidationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::ClaimsValidation(kind),
    }
}

/// Helper function to create missing field errors.
pub fn missing_field(field: &str) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::MissingField(field.to_string()),
    }
}
