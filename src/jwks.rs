//! # JWKS (JSON Web Key Set) Module
//!
//! Published signing keys and their conversion into usable RSA public keys.
//!
//! ## Behaviour
//! - **No caching**: every call to [`JwksProvider::get_key_set`] goes to the API
//! - **First match wins**: lookup by `kid` is a linear scan
//! - **RSA only**: keys are rebuilt from their modulus and exponent through
//!   the [`der`](crate::der) encoder

use crate::client::HttpJsonClient;
use crate::der;
use crate::error::{AuthError, HttpError};
use crate::parser::BASE64URL;
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Method;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Represents a JSON Web Key (JWK).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Jwk {
    /// Key ID.
    pub kid: String,
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Algorithm (e.g., "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key usage (e.g., "sig").
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Key operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
    /// Curve (for EC keys).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// X coordinate (for EC keys).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Y coordinate (for EC keys).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// RSA modulus, base64url big-endian.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent, base64url big-endian.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Whether the key is extractable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
}

impl Jwk {
    /// Creates an RSA signing key record from base64url `n` and `e`.
    pub fn rsa(kid: impl Into<String>, n: impl Into<String>, e: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            key_ops: None,
            crv: None,
            x: None,
            y: None,
            n: Some(n.into()),
            e: Some(e.into()),
            ext: None,
        }
    }

    /// Decoded big-endian modulus and exponent.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnsupportedKeyType`] if `kty` is not `RSA`
    /// - [`AuthError::InvalidKeyComponent`] if `n` or `e` is missing, empty,
    ///   or not base64url
    pub fn rsa_components(&self) -> Result<(Vec<u8>, Vec<u8>), AuthError> {
        if self.kty != "RSA" {
            return Err(AuthError::UnsupportedKeyType(self.kty.clone()));
        }
        let n = decode_component(self.n.as_deref(), "n")?;
        let e = decode_component(self.e.as_deref(), "e")?;
        Ok((n, e))
    }

    /// DER-encoded `SubjectPublicKeyInfo` of this key.
    ///
    /// # Errors
    ///
    /// See [`Jwk::rsa_components`].
    pub fn to_public_key_der(&self) -> Result<Vec<u8>, AuthError> {
        let (n, e) = self.rsa_components()?;
        Ok(der::subject_public_key_info(&n, &e))
    }

    /// PEM-encoded `SubjectPublicKeyInfo` of this key.
    ///
    /// # Errors
    ///
    /// See [`Jwk::rsa_components`].
    pub fn to_public_key_pem(&self) -> Result<String, AuthError> {
        let spki = self.to_public_key_der()?;
        Ok(der::pem_encode(&spki, der::PUBLIC_KEY_LABEL))
    }

    /// Parsed RSA public key.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Jwk::rsa_components`], and
    /// [`AuthError::InvalidKeyComponent`] when the encoded key is rejected by
    /// the RSA key parser (e.g. an out-of-range exponent).
    pub fn to_public_key(&self) -> Result<RsaPublicKey, AuthError> {
        let spki = self.to_public_key_der()?;
        RsaPublicKey::from_public_key_der(&spki).map_err(|e| {
            AuthError::InvalidKeyComponent(format!(
                "Failed to create key from RSA components: {e}"
            ))
        })
    }
}

fn decode_component(value: Option<&str>, name: &str) -> Result<Vec<u8>, AuthError> {
    let value = value.ok_or_else(|| {
        AuthError::InvalidKeyComponent(format!("Missing {name} for RSA key"))
    })?;
    let bytes = BASE64URL
        .decode(value)
        .map_err(|e| AuthError::InvalidKeyComponent(format!("Failed to decode {name}: {e}")))?;
    if bytes.is_empty() {
        return Err(AuthError::InvalidKeyComponent(format!("Empty {name} for RSA key")));
    }
    Ok(bytes)
}

/// A JSON Web Key Set as published by the issuer.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct JwkSet {
    /// A list of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Finds the first key with the given Key ID.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// Source of the issuer's current key set.
#[async_trait]
pub trait JwksProvider: Send + Sync {
    /// Fetches the key set.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`HttpError`] when the key set cannot be obtained.
    async fn get_key_set(&self) -> Result<JwkSet, HttpError>;
}

/// [`JwksProvider`] backed by `GET /jwks` on the Backend API.
#[derive(Clone)]
pub struct ApiJwks {
    client: Arc<dyn HttpJsonClient>,
}

impl ApiJwks {
    pub fn new(client: Arc<dyn HttpJsonClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JwksProvider for ApiJwks {
    async fn get_key_set(&self) -> Result<JwkSet, HttpError> {
        tracing::debug!("Fetching JWKS");
        let body = self.client.request(Method::GET, "/jwks", None).await?;

        let jwks: JwkSet = serde_json::from_value(body).map_err(|e| {
            let error_msg = format!("Failed to parse JWKS response: {e}");
            tracing::error!("{}", error_msg);
            HttpError::Decode(error_msg)
        })?;

        tracing::debug!("Fetched JWKS with {} keys", jwks.keys.len());
        Ok(jwks)
    }
}
