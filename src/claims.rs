//! Token claims and the expiry check.

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// The decoded payload of a session token.
///
/// Claims are kept as an open JSON object so that custom session claims
/// survive verification untouched. Accessors cover the registered claims
/// Clerk sets on session tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Wraps an existing JSON object.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the raw value of a claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Subject (the Clerk user ID).
    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Issuer (the Frontend API URL of the instance).
    pub fn iss(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// Session ID.
    pub fn sid(&self) -> Option<&str> {
        self.get_str("sid")
    }

    /// Authorized party (the origin the token was issued for).
    pub fn azp(&self) -> Option<&str> {
        self.get_str("azp")
    }

    /// Issued-at time, when present and integral.
    pub fn iat(&self) -> Option<i64> {
        self.get("iat").and_then(Value::as_i64)
    }

    /// Not-before time, when present and integral.
    pub fn nbf(&self) -> Option<i64> {
        self.get("nbf").and_then(Value::as_i64)
    }

    /// Expiration time in epoch seconds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] if `exp` is present but not a number.
    pub fn exp(&self) -> Result<Option<i64>, AuthError> {
        match self.get("exp") {
            None => Ok(None),
            Some(value) => numeric_seconds(value)
                .map(Some)
                .ok_or_else(|| AuthError::malformed("exp claim is not numeric")),
        }
    }

    /// Borrows the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the claims, returning the underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn numeric_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    }
}

/// Checks the `exp` claim against `now` (epoch seconds).
///
/// A token without `exp` passes. A token whose `exp` equals `now` is still valid.
///
/// # Errors
///
/// - [`AuthError::ExpiredToken`] if `exp < now`
/// - [`AuthError::MalformedToken`] if `exp` is not numeric
pub fn check_expiry(claims: &Claims, now: i64) -> Result<(), AuthError> {
    match claims.exp()? {
        Some(exp) if exp < now => {
            tracing::warn!("Token expired at {} (now {})", exp, now);
            Err(AuthError::ExpiredToken { exp, now })
        }
        _ => Ok(()),
    }
}

/// Current time in epoch seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
