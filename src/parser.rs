//! # JWT Parsing Module
//!
//! Structural parsing of compact-serialized JWTs.
//!
//! ## Behaviour
//! - **Exact structure**: a token is exactly three non-empty base64url segments
//! - **Lenient padding**: segments may or may not carry `=` padding
//! - **Byte-exact signing input**: the signature is checked over the original
//!   `header.payload` text, never over re-serialized JSON

use crate::claims::Claims;
use crate::error::AuthError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Base64url engine that accepts segments with or without trailing padding.
pub(crate) const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// JWT Header structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Algorithm
    pub alg: String,
    /// Key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Token type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// A token split into its decoded parts.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    /// Decoded header.
    pub header: JwtHeader,
    /// Decoded claims.
    pub claims: Claims,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// The undecoded `header.payload` text the signature covers.
    pub signing_input: String,
}

/// JWT Parser.
pub struct JwtParser;

impl JwtParser {
    /// Upper bound on the size of an accepted token.
    pub const MAX_TOKEN_LENGTH: usize = 8 * 1024;

    /// Splits a token into header, claims, signature and signing input.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] when the token does not have
    /// exactly three non-empty segments, when a segment is not valid base64url,
    /// or when the header or claims are not JSON objects.
    pub fn parse(token: &str) -> Result<ParsedToken, AuthError> {
        if token.len() > Self::MAX_TOKEN_LENGTH {
            return Err(AuthError::malformed("token exceeds maximum length"));
        }

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::malformed(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        }
        if parts.iter().any(|part| part.is_empty()) {
            return Err(AuthError::malformed("empty token segment"));
        }

        tracing::debug!(
            "JWT parts lengths - header: {}, payload: {}, signature: {}",
            parts[0].len(),
            parts[1].len(),
            parts[2].len()
        );

        let header_bytes = decode_segment(parts[0], "header")?;
        let header: JwtHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| AuthError::malformed(format!("invalid header JSON: {e}")))?;

        let claims_bytes = decode_segment(parts[1], "claims")?;
        let claims: Claims = serde_json::from_slice(&claims_bytes)
            .map_err(|e| AuthError::malformed(format!("invalid claims JSON: {e}")))?;

        let signature = decode_segment(parts[2], "signature")?;

        Ok(ParsedToken {
            header,
            claims,
            signature,
            signing_input: format!("{}.{}", parts[0], parts[1]),
        })
    }

    /// Strips the `Bearer ` scheme from an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] when the scheme is missing or the
    /// token after it is empty.
    pub fn strip_bearer(header_value: &str) -> Result<&str, AuthError> {
        let value = header_value.trim();
        let (scheme, token) = value
            .split_once(' ')
            .ok_or_else(|| AuthError::malformed("missing bearer scheme"))?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::malformed("missing bearer scheme"));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::malformed("empty bearer token"));
        }
        Ok(token)
    }
}

/// Decodes one base64url segment, padded or not.
pub(crate) fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, AuthError> {
    BASE64URL.decode(segment).map_err(|e| {
        tracing::warn!("Failed to decode JWT {}: {}", what, e);
        AuthError::malformed(format!("invalid base64url in {what}: {e}"))
    })
}
