//! OAuth 2.0 token response types.

mod tokens;

pub use tokens::OAuth2Token;
