use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Claims we read out of the bearer token handed to us by the license API.
/// Everything other than the expiry is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// NumericDate; may carry a fractional part.
    pub exp: f64,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, SessionError> {
        let secs = self.exp.floor();
        if !secs.is_finite() {
            return Err(SessionError::InvalidExpiry);
        }
        DateTime::from_timestamp(secs as i64, 0).ok_or(SessionError::InvalidExpiry)
    }
}

/// Decode the claims of a bearer token.
///
/// The signing secret lives on the server, so the signature is not checked
/// here and neither is `exp`; callers compare the expiry against their own
/// clock. A token with missing segments, a non-JSON header or payload, or no
/// `exp` claim is rejected.
pub fn decode_claims(token: &str) -> Result<TokenClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<TokenClaims>(token.trim(), &DecodingKey::from_secret(&[]), &validation)?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn sign<T: Serialize>(claims: &T) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(b"server-side")).unwrap()
    }

    #[test]
    fn test_decode_claims_ignores_foreign_signature() {
        let decoded = decode_claims(&sign(&json!({ "sub": "alice", "exp": 1_900_000_000 }))).unwrap();
        assert_eq!(decoded.expires_at().unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_decode_claims_keeps_past_expiry() {
        let decoded = decode_claims(&sign(&TokenClaims { exp: 1_000.0 })).unwrap();
        assert_eq!(decoded.expires_at().unwrap().timestamp(), 1_000);
    }

    #[test]
    fn test_decode_claims_accepts_audience_and_odd_claims() {
        let tokens = [
            json!({ "sub": "alice", "exp": 1_900_000_000, "aud": "license-api" }),
            json!({ "sub": 42, "exp": 1_900_000_000, "aud": ["a", "b"], "iss": "licenses" }),
        ];
        for claims in tokens {
            let decoded = decode_claims(&sign(&claims)).unwrap();
            assert_eq!(decoded.expires_at().unwrap().timestamp(), 1_900_000_000);
        }
    }

    #[test]
    fn test_fractional_expiry_is_floored() {
        let decoded = decode_claims(&sign(&json!({ "exp": 1_900_000_000.5 }))).unwrap();
        assert_eq!(decoded.expires_at().unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_decode_claims_requires_exp() {
        assert!(decode_claims(&sign(&json!({ "sub": "alice" }))).is_err());
    }

    #[test]
    fn test_decode_claims_rejects_garbage() {
        for token in ["", "not-a-token", "a.b", "a.b.c", "e30.e30.sig"] {
            assert!(decode_claims(token).is_err(), "{token:?} should be rejected");
        }
    }
}
