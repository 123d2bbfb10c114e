//! # identity-auth
//!
//! Pluggable login through external OAuth 2.0 / OpenID Connect identity
//! providers. Whatever the provider (REST userinfo endpoint or ID token), the
//! result is one normalized [`AuthUser`](oauth::AuthUser).
//!
//! ## Architecture
//!
//! - `oauth::Provider` is the single authorization code flow (authorization URL,
//!   PKCE, code exchange, bearer GETs); each provider contributes only its
//!   defaults and an `IdentityStrategy`.
//! - `oauth::Registry` hands out a fresh provider instance per lookup.
//! - `context::RequestContext` bounds every outbound call by the caller's
//!   cancellation and deadline. Nothing is retried.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use identity_auth::{http::HttpClientBuilder, oauth::providers};
//!
//! let registry = providers::default_registry(HttpClientBuilder::new().build()?);
//! let mut zoho = registry.get("zoho")?;
//! zoho.set_client_id(client_id);
//! zoho.set_client_secret(client_secret);
//! zoho.set_redirect_url(redirect_url);
//!
//! let request = zoho.authorization_request()?;
//! // redirect to request.url, keep request.state and request.pkce_verifier ...
//! let token = zoho.exchange_code(&code, request.pkce_verifier.as_ref()).await?;
//! let user = zoho.fetch_auth_user(&token).await?;
//! ```

pub mod context;
pub mod error;
pub mod http;
pub mod oauth;

pub use context::RequestContext;
pub use error::{Error, ErrorKind};
