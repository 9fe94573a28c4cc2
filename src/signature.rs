//! RS256 signature verification.

use crate::error::AuthError;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::Verifier as _;
use rsa::RsaPublicKey;

/// The only accepted `alg` header value.
pub const RS256: &str = "RS256";

/// Verifies an RSASSA-PKCS1-v1_5 SHA-256 signature over `signing_input`.
///
/// Returns `Ok(false)` for any signature that does not verify, including one
/// of the wrong length.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if `alg` is not `RS256`.
pub fn verify_signature(
    alg: &str,
    signing_input: &[u8],
    signature: &[u8],
    key: &RsaPublicKey,
) -> Result<bool, AuthError> {
    if alg != RS256 {
        tracing::warn!(
            "Unsupported JWT algorithm: {} (expected: {})",
            alg,
            RS256
        );
        return Err(AuthError::UnsupportedAlgorithm(alg.to_string()));
    }

    let Ok(signature) = Signature::try_from(signature) else {
        return Ok(false);
    };

    let verifying_key = VerifyingKey::<Sha256>::new(key.clone());
    Ok(verifying_key.verify(signing_input, &signature).is_ok())
}
