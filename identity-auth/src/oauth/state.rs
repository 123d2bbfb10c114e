//! Short-lived store for pending authorization requests.
//!
//! A provider instance never remembers a login attempt. Callers without a session
//! layer of their own can park the per-attempt state and PKCE verifier here
//! between the redirect to the provider and its callback.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::pkce::PkceVerifier;
use super::provider::AuthorizationRequest;

/// Data remembered for one login attempt.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// Registry name of the provider the user was sent to.
    pub provider: String,
    /// PKCE verifier if PKCE was used.
    pub pkce_verifier: Option<PkceVerifier>,
    /// When this state expires.
    pub expires_at: DateTime<Utc>,
}

/// Concurrent, expiring map from state token to pending authorization.
pub struct StateManager {
    pending: DashMap<String, PendingAuthorization>,
    ttl: Duration,
}

impl StateManager {
    /// Create a new state manager with default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Remember `request` until its callback arrives or the TTL passes.
    pub fn remember(&self, provider: &str, request: &AuthorizationRequest) {
        self.pending.insert(
            request.state.clone(),
            PendingAuthorization {
                provider: provider.to_string(),
                pkce_verifier: request.pkce_verifier.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    /// Validate and consume a state token.
    ///
    /// A state can be taken once. Unknown and expired states return `None`.
    pub fn take(&self, state: &str) -> Option<PendingAuthorization> {
        let (_, pending) = self.pending.remove(state)?;
        if Utc::now() > pending.expires_at {
            return None;
        }
        Some(pending)
    }

    /// Drop expired entries. Call periodically from the owning service.
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        self.pending.retain(|_, pending| pending.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::provider::test_support::provider;

    fn request(pkce: bool) -> AuthorizationRequest {
        provider("https://idp.example.com", pkce)
            .authorization_request()
            .unwrap()
    }

    #[test]
    fn test_take_returns_remembered_verifier() {
        let manager = StateManager::new();
        let request = request(true);
        manager.remember("test", &request);

        let pending = manager.take(&request.state).unwrap();
        assert_eq!(pending.provider, "test");
        assert_eq!(pending.pkce_verifier, request.pkce_verifier);
    }

    #[test]
    fn test_take_unknown_state() {
        let manager = StateManager::new();
        assert!(manager.take("invalid_state").is_none());
    }

    #[test]
    fn test_state_consumed_after_take() {
        let manager = StateManager::new();
        let request = request(false);
        manager.remember("test", &request);

        assert!(manager.take(&request.state).is_some());
        assert!(manager.take(&request.state).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_expired_state() {
        let manager = StateManager::with_ttl(Duration::seconds(-1));
        let request = request(true);
        manager.remember("test", &request);

        assert!(manager.take(&request.state).is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let expired = StateManager::with_ttl(Duration::seconds(-1));
        expired.remember("test", &request(false));
        expired.remember("test", &request(false));
        assert_eq!(expired.len(), 2);

        expired.cleanup_expired();
        assert!(expired.is_empty());

        let live = StateManager::new();
        live.remember("test", &request(false));
        live.cleanup_expired();
        assert_eq!(live.len(), 1);
    }
}
