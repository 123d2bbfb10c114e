//! Built-in identity providers.
//!
//! Each module exposes `NAME` and a `new_provider(http)` constructor returning a
//! fresh [`Provider`](crate::oauth::Provider) with that provider's fixed defaults.

pub mod discord;
pub mod github;
pub mod gitlab;
pub mod google;
pub mod zoho;

use super::registry::Registry;
use crate::http::HttpClient;

/// Register every built-in provider on `registry`.
pub fn register_all(registry: &mut Registry) {
    registry.register(discord::NAME, discord::new_provider);
    registry.register(github::NAME, github::new_provider);
    registry.register(gitlab::NAME, gitlab::new_provider);
    registry.register(google::NAME, google::new_provider);
    registry.register(zoho::NAME, zoho::new_provider);
}

/// A registry holding all built-in providers, sharing `http`.
pub fn default_registry(http: HttpClient) -> Registry {
    let mut registry = Registry::new(http);
    register_all(&mut registry);
    registry
}
