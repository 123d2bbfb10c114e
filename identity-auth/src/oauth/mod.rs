//! OAuth 2.0 / OpenID Connect login against external identity providers.

pub mod claims;
mod pkce;
mod provider;
pub mod providers;
mod registry;
mod state;
pub mod token;
mod user;

pub use claims::{Claims, IssuerPolicy};
pub use pkce::{PkceChallenge, PkceVerifier, CHALLENGE_METHOD_S256};
pub use provider::{
    generate_state, AuthorizationRequest, IdentityStrategy, Provider, ProviderConfig,
};
pub use registry::{ProviderDescriptor, ProviderFactory, Registry};
pub use state::{PendingAuthorization, StateManager};
pub use token::OAuth2Token;
pub use user::AuthUser;
