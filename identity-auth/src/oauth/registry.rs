//! Name-keyed table of provider constructors.

use std::collections::HashMap;
use std::fmt;

use log::*;
use serde::Serialize;

use super::provider::Provider;
use crate::error::{config_error, ConfigErrorKind, Error};
use crate::http::HttpClient;

/// Builds a fresh provider instance with the provider's fixed defaults.
pub type ProviderFactory = Box<dyn Fn(HttpClient) -> Provider + Send + Sync>;

/// Summary of a registered provider, as listed to sign-in method consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub display_name: String,
    pub pkce: bool,
    pub id_token: bool,
}

/// Registry of known identity providers.
///
/// Populated once at startup through `register`, which needs exclusive access.
/// Share it behind an `Arc` afterwards; lookups only read, so concurrent
/// callers need no lock.
pub struct Registry {
    http: HttpClient,
    factories: HashMap<String, ProviderFactory>,
}

impl Registry {
    /// Create an empty registry whose providers will share `http`.
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            factories: HashMap::new(),
        }
    }

    /// Register a provider constructor under `name` (stored lowercase).
    ///
    /// Registering a name twice replaces the earlier constructor.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(HttpClient) -> Provider + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            warn!("Provider {} was registered twice, keeping the latest", name);
        } else {
            debug!("Registered provider {}", name);
        }
    }

    /// Return a brand-new provider instance for `name`.
    ///
    /// Instances are never shared: configure credentials on the returned value
    /// and use it for a single login attempt.
    pub fn get(&self, name: &str) -> Result<Provider, Error> {
        let factory = self.factories.get(&name.to_lowercase()).ok_or_else(|| {
            config_error(
                ConfigErrorKind::UnknownProvider,
                &format!("unknown provider: {}", name),
            )
        })?;
        Ok(factory(self.http.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Describe every registered provider, ordered by name.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name).ok())
            .map(|provider| ProviderDescriptor {
                name: provider.name().to_string(),
                display_name: provider.display_name().to_string(),
                pkce: provider.pkce(),
                id_token: provider.uses_id_token(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.names())
            .finish_non_exhaustive()
    }
}
