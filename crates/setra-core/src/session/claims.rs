//! Bearer token payload decoding.
//!
//! The signature is not verified here; the backend does that on every call.
//! The console only reads the identity claims it needs for role checks.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiry in seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the payload segment of a `header.payload.signature` token.
    pub fn decode(token: &str) -> Result<Self, SessionError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(SessionError::MalformedToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| SessionError::MalformedToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| SessionError::MalformedToken(e.to_string()))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Tokens without `exp` never expire on the client side.
    pub fn ensure_fresh(&self, now_ms: u64) -> Result<(), SessionError> {
        match self.expires_at() {
            Some(at) if at.timestamp_millis() <= now_ms as i64 => {
                Err(SessionError::TokenExpired(at))
            }
            _ => Ok(()),
        }
    }
}

/// Unsigned token carrying `claims`, for tests.
#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_identity_claims() {
        let token = unsigned_token(&json!({
            "sub": "u1",
            "email": "ana@example.com",
            "roles": ["support", "operator"],
            "iat": 1_700_000_000
        }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.roles, vec!["support", "operator"]);
        assert!(claims.exp.is_none());
        assert!(claims.ensure_fresh(u64::MAX / 2).is_ok());
    }

    #[test]
    fn missing_roles_default_to_empty() {
        let token = unsigned_token(&json!({ "sub": "u2", "email": "b@example.com" }));
        assert!(TokenClaims::decode(&token).unwrap().roles.is_empty());
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "abc", "a.b", "a.!!!.c", "a.b.c.d"] {
            assert!(
                matches!(TokenClaims::decode(bad), Err(SessionError::MalformedToken(_))),
                "{bad:?} should be malformed"
            );
        }
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));
        assert!(TokenClaims::decode(&not_json).is_err());
    }

    #[test]
    fn expiry_is_checked_against_clock() {
        let token = unsigned_token(&json!({
            "sub": "u1", "email": "a@example.com", "roles": [], "exp": 1_700_000_000
        }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert!(claims.ensure_fresh(1_699_999_999_000).is_ok());
        assert!(matches!(
            claims.ensure_fresh(1_700_000_000_000),
            Err(SessionError::TokenExpired(_))
        ));
    }
}
