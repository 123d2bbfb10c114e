//! Typed access to provider claims and unverified ID token extraction.

use jsonwebtoken::dangerous::insecure_decode;
use jsonwebtoken::TokenData;
use log::*;
use serde_json::{Map, Value};

use crate::error::{
    claims_decode_error, claims_validation_error, missing_field, ClaimsDecodeErrorKind,
    ClaimsValidationErrorKind, Error, ErrorKind,
};

/// A provider claim set: either a decoded ID token payload or a userinfo JSON object.
///
/// Accessors check the expected type of every field they read and report a typed
/// absence (`MissingField`) or mismatch (`ClaimsDecode(UnexpectedType)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Build claims from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(claims_decode_error(
                ClaimsDecodeErrorKind::MalformedPayload,
                &format!("expected a JSON object, got {}", type_name(&other)),
            )),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A string claim that must be present and non-empty.
    pub fn require_str(&self, name: &str) -> Result<&str, Error> {
        self.optional_str(name)?.ok_or_else(|| missing_field(name))
    }

    /// A string claim that may be absent, null or empty.
    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, Error> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(unexpected_type(name, "string", other)),
        }
    }

    /// A boolean claim that may be absent or null.
    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, Error> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(unexpected_type(name, "boolean", other)),
        }
    }

    /// An identifier claim. Providers emit these as strings or as integers.
    pub fn require_id(&self, name: &str) -> Result<String, Error> {
        match self.0.get(name) {
            None | Some(Value::Null) => Err(missing_field(name)),
            Some(Value::String(s)) if s.is_empty() => Err(missing_field(name)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            Some(other) => Err(unexpected_type(name, "string or integer", other)),
        }
    }

    /// The `aud` claim, which may be a single string or an array of strings.
    pub fn audience(&self) -> Result<Vec<&str>, Error> {
        match self.0.get("aud") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(aud)) => Ok(vec![aud.as_str()]),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .ok_or_else(|| unexpected_type("aud", "string", value))
                })
                .collect(),
            Some(other) => Err(unexpected_type("aud", "string or array", other)),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Decode the claim set of a JWT without verifying its signature.
///
/// Trust boundary: callers only pass ID tokens read from a token response that
/// this crate fetched itself, directly from the provider's token endpoint over
/// TLS. The channel authenticates the token, so the signature is not checked and
/// no JWKS is fetched. Issuer and audience are still validated by `IssuerPolicy`
/// to catch a substituted token. Never use this for tokens received from a
/// browser or any other third party.
pub fn decode_unverified(raw_token: &str) -> Result<Claims, Error> {
    let data: TokenData<Map<String, Value>> =
        insecure_decode(raw_token).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::ClaimsDecode(ClaimsDecodeErrorKind::MalformedToken),
        })?;

    Ok(Claims(data.claims))
}

/// Issuer allow-list and audience check for unverified ID tokens.
#[derive(Debug, Clone, Copy)]
pub struct IssuerPolicy {
    issuers: &'static [&'static str],
}

impl IssuerPolicy {
    pub const fn new(issuers: &'static [&'static str]) -> Self {
        Self { issuers }
    }

    pub fn issuers(&self) -> &'static [&'static str] {
        self.issuers
    }

    /// Validate `iss` against the allow-list and require `aud` to contain `client_id`.
    pub fn validate(&self, claims: &Claims, client_id: &str) -> Result<(), Error> {
        let issuer = claims.optional_str("iss")?.unwrap_or_default();
        if !self.issuers.contains(&issuer) {
            return Err(claims_validation_error(
                ClaimsValidationErrorKind::InvalidIssuer,
                &format!("invalid id_token issuer: {}", issuer),
            ));
        }

        let audience = claims.audience()?;
        if client_id.is_empty() || !audience.contains(&client_id) {
            return Err(claims_validation_error(
                ClaimsValidationErrorKind::InvalidAudience,
                "invalid id_token audience",
            ));
        }

        Ok(())
    }
}

/// Read an email claim under the provider's verification flag.
///
/// An explicit `false` verification flag rejects the login. A missing flag is
/// taken as verified since the provider asserted nothing either way.
pub fn verified_email<'a>(
    claims: &'a Claims,
    email_field: &str,
    verified_field: &str,
) -> Result<&'a str, Error> {
    let email = claims.require_str(email_field)?;
    match claims.optional_bool(verified_field)? {
        Some(true) => Ok(email),
        Some(false) => Err(claims_validation_error(
            ClaimsValidationErrorKind::UnverifiedEmail,
            "provider reports the email address as unverified",
        )),
        None => {
            debug!("no {} claim present, accepting email as asserted", verified_field);
            Ok(email)
        }
    }
}

fn unexpected_type(name: &str, expected: &str, value: &Value) -> Error {
    claims_decode_error(
        ClaimsDecodeErrorKind::UnexpectedType,
        &format!(
            "claim {} should be a {}, got {}",
            name,
            expected,
            type_name(value)
        ),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{jwt_with_alg, unsigned_jwt};
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const ISSUERS: &[&str] = &["https://accounts.example.com", "https://accounts.example.eu"];

    fn claims(value: Value) -> Claims {
        Claims::from_value(value).unwrap()
    }

    #[test]
    fn test_require_str() {
        let claims = claims(json!({ "sub": "123", "empty": "", "n": 5 }));
        assert_eq!(claims.require_str("sub").unwrap(), "123");
        assert_eq!(
            claims.require_str("empty").unwrap_err().error_kind,
            ErrorKind::MissingField("empty".to_string())
        );
        assert_eq!(
            claims.require_str("absent").unwrap_err().error_kind,
            ErrorKind::MissingField("absent".to_string())
        );
        assert_eq!(
            claims.require_str("n").unwrap_err().error_kind,
            ErrorKind::ClaimsDecode(ClaimsDecodeErrorKind::UnexpectedType)
        );
    }

    #[test]
    fn test_optional_bool() {
        let claims = claims(json!({ "yes": true, "text": "true", "nothing": null }));
        assert_eq!(claims.optional_bool("yes").unwrap(), Some(true));
        assert_eq!(claims.optional_bool("nothing").unwrap(), None);
        assert_eq!(claims.optional_bool("absent").unwrap(), None);
        assert!(claims.optional_bool("text").is_err());
    }

    #[test]
    fn test_require_id_accepts_integers() {
        let claims = claims(json!({ "id": 583231, "sub": "abc", "bad": 1.5 }));
        assert_eq!(claims.require_id("id").unwrap(), "583231");
        assert_eq!(claims.require_id("sub").unwrap(), "abc");
        assert!(claims.require_id("bad").is_err());
    }

    #[test]
    fn test_audience_forms() {
        assert_eq!(claims(json!({ "aud": "client" })).audience().unwrap(), vec!["client"]);
        assert_eq!(
            claims(json!({ "aud": ["a", "client"] })).audience().unwrap(),
            vec!["a", "client"]
        );
        assert!(claims(json!({})).audience().unwrap().is_empty());
        assert!(claims(json!({ "aud": [1] })).audience().is_err());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = Claims::from_value(json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::ClaimsDecode(ClaimsDecodeErrorKind::MalformedPayload)
        );
    }

    #[test]
    fn test_decode_unverified_ignores_signature_and_expiry() {
        let token = unsigned_jwt(&json!({
            "iss": "https://accounts.example.com",
            "sub": "123",
            "aud": "client",
            "exp": 1
        }));

        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.require_str("sub").unwrap(), "123");
        assert_eq!(claims.require_str("iss").unwrap(), "https://accounts.example.com");
    }

    #[test]
    fn test_decode_unverified_accepts_asymmetric_algorithms() {
        for alg in ["RS256", "PS256", "ES256", "HS256"] {
            let token = jwt_with_alg(
                alg,
                &json!({ "iss": "https://accounts.example.com", "sub": "123", "aud": ["client"] }),
            );
            let claims = decode_unverified(&token)
                .unwrap_or_else(|e| panic!("{} token should decode: {}", alg, e));
            assert_eq!(claims.require_str("sub").unwrap(), "123");
            assert_eq!(claims.audience().unwrap(), vec!["client"]);
        }
    }

    #[test]
    fn test_decode_unverified_rejects_garbage() {
        for raw in ["", "not-a-jwt", "a.b.c"] {
            let err = decode_unverified(raw).unwrap_err();
            assert_eq!(
                err.error_kind,
                ErrorKind::ClaimsDecode(ClaimsDecodeErrorKind::MalformedToken),
                "token {:?} should not decode",
                raw
            );
        }
    }

    #[test]
    fn test_issuer_policy_accepts_known_issuer_and_audience() {
        let policy = IssuerPolicy::new(ISSUERS);
        let claims = claims(json!({ "iss": "https://accounts.example.eu", "aud": ["client"] }));
        assert!(policy.validate(&claims, "client").is_ok());
    }

    #[test]
    fn test_issuer_policy_rejects_unknown_issuer() {
        let policy = IssuerPolicy::new(ISSUERS);
        let claims = claims(json!({ "iss": "https://accounts.example.de", "aud": "client" }));
        assert_eq!(
            policy.validate(&claims, "client").unwrap_err().error_kind,
            ErrorKind::ClaimsValidation(ClaimsValidationErrorKind::InvalidIssuer)
        );
    }

    #[test]
    fn test_issuer_policy_rejects_missing_issuer() {
        let policy = IssuerPolicy::new(ISSUERS);
        let claims = claims(json!({ "aud": "client" }));
        assert_eq!(
            policy.validate(&claims, "client").unwrap_err().error_kind,
            ErrorKind::ClaimsValidation(ClaimsValidationErrorKind::InvalidIssuer)
        );
    }

    #[test]
    fn test_issuer_policy_rejects_audience_mismatch() {
        let policy = IssuerPolicy::new(ISSUERS);
        let claims = claims(json!({ "iss": "https://accounts.example.com", "aud": "other" }));
        assert_eq!(
            policy.validate(&claims, "client").unwrap_err().error_kind,
            ErrorKind::ClaimsValidation(ClaimsValidationErrorKind::InvalidAudience)
        );
        assert_eq!(
            policy.validate(&claims, "").unwrap_err().error_kind,
            ErrorKind::ClaimsValidation(ClaimsValidationErrorKind::InvalidAudience)
        );
    }

    #[test]
    fn test_verified_email_policy() {
        let verified = claims(json!({ "email": "a@b.com", "email_verified": true }));
        assert_eq!(verified_email(&verified, "email", "email_verified").unwrap(), "a@b.com");

        let unflagged = claims(json!({ "email": "a@b.com" }));
        assert_eq!(verified_email(&unflagged, "email", "email_verified").unwrap(), "a@b.com");

        let unverified = claims(json!({ "email": "a@b.com", "email_verified": false }));
        assert_eq!(
            verified_email(&unverified, "email", "email_verified")
                .unwrap_err()
                .error_kind,
            ErrorKind::ClaimsValidation(ClaimsValidationErrorKind::UnverifiedEmail)
        );

        let missing = claims(json!({ "email_verified": true }));
        assert_eq!(
            verified_email(&missing, "email", "email_verified")
                .unwrap_err()
                .error_kind,
            ErrorKind::MissingField("email".to_string())
        );
    }
}
