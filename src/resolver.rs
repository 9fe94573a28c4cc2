//! Verification key resolution.

use crate::error::AuthError;
use crate::jwks::JwksProvider;
use crate::parser::JwtHeader;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use std::fmt;
use std::sync::Arc;

/// Where the verification key comes from.
#[derive(Clone)]
pub enum KeyResolver {
    /// A configured key; the token's `kid` is ignored.
    Static(RsaPublicKey),
    /// The issuer's key set, fetched on every resolution.
    Jwks(Arc<dyn JwksProvider>),
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        match self {
            Self::Static(_) => f.write_str("KeyResolver::Static"),
            Self::Jwks(_) => f.write_str("KeyResolver::Jwks"),
        }
    }
}

impl KeyResolver {
    /// Builds a static resolver from PEM text.
    ///
    /// Both `PUBLIC KEY` (SubjectPublicKeyInfo) and `RSA PUBLIC KEY` (PKCS#1)
    /// framings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the PEM is not an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, AuthError> {
        parse_public_key_pem(pem).map(Self::Static)
    }

    /// Resolves the key for a token with the given header.
    ///
    /// # Errors
    ///
    /// On the JWKS path:
    /// - [`AuthError::MalformedToken`] if the header has no `kid`
    /// - [`AuthError::Upstream`] if the key set cannot be fetched
    /// - [`AuthError::KeyNotFound`] if no key carries the `kid`
    /// - the conversion errors of [`Jwk::to_public_key`](crate::Jwk::to_public_key)
    pub async fn resolve(&self, header: &JwtHeader) -> Result<RsaPublicKey, AuthError> {
        match self {
            Self::Static(key) => Ok(key.clone()),
            Self::Jwks(provider) => {
                let kid = header
                    .kid
                    .as_deref()
                    .filter(|kid| !kid.is_empty())
                    .ok_or_else(|| AuthError::malformed("key id missing"))?;

                let jwks = provider.get_key_set().await?;
                let jwk = jwks.find(kid).ok_or_else(|| {
                    tracing::warn!("Key with kid '{}' not found in JWKS", kid);
                    AuthError::KeyNotFound(kid.to_string())
                })?;

                jwk.to_public_key()
            }
        }
    }
}

/// Parses an RSA public key from `PUBLIC KEY` or `RSA PUBLIC KEY` PEM text.
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] if the text is not an RSA public key.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, AuthError> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| AuthError::Configuration(format!("invalid static RSA public key: {e}")))
}
