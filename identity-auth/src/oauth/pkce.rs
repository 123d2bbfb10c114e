//! PKCE (Proof Key for Code Exchange) support for OAuth 2.0.
//!
//! Implements the S256 method of RFC 7636. A fresh verifier is generated per
//! authorization attempt; nothing here holds shared state.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// The only challenge method this crate emits.
pub const CHALLENGE_METHOD_S256: &str = "S256";

/// PKCE code verifier (random string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a new random PKCE verifier.
    ///
    /// 32 random bytes encode to 43 base64url characters, the minimum length allowed.
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        Self(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// Wrap a verifier previously handed to the caller (e.g. read back from a session).
    pub fn from_string(verifier: String) -> Self {
        Self(verifier)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the matching S256 code challenge.
    pub fn challenge(&self) -> PkceChallenge {
        PkceChallenge::from_verifier(self)
    }
}

/// PKCE code challenge: base64url(SHA-256(verifier)) without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let digest = Sha256::digest(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `code_challenge_method` parameter.
    pub fn method(&self) -> &'static str {
        CHALLENGE_METHOD_S256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_verifier_generation() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        assert!(verifier
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_pkce_verifiers_are_unique() {
        assert_ne!(PkceVerifier::generate(), PkceVerifier::generate());
    }

    #[test]
    fn test_pkce_challenge_known_value() {
        let verifier =
            PkceVerifier::from_string("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWEOEjXk".to_string());
        assert_eq!(
            verifier.challenge().as_str(),
            "TP3DZQl9rJnri9eRuZaFS6Q7czCrth7sEZC00LreApo"
        );
        assert_eq!(verifier.challenge().method(), "S256");
    }

    #[test]
    fn test_pkce_challenge_has_no_padding() {
        let challenge = PkceVerifier::generate().challenge();
        assert_eq!(challenge.as_str().len(), 43);
        assert!(!challenge.as_str().contains('='));
    }

    #[test]
    fn test_pkce_challenge_deterministic() {
        let verifier = PkceVerifier::from_string("test_verifier".to_string());
        assert_eq!(verifier.challenge(), verifier.challenge());
    }
}
