//! Defines the error types that can occur during session verification.
//!
//! Every stage of the verification pipeline fails with its own variant of
//! [`AuthError`]; the verifier never merges or downgrades them, so callers can
//! match on the exact reason a token was rejected. Failures of the remote
//! collaborators are carried unchanged inside [`AuthError::Upstream`].

use thiserror::Error;

/// Represents errors that can occur while verifying a session token.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// The token (or one of its segments) is structurally invalid.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The `exp` claim lies in the past.
    #[error("token expired at {exp} (now {now})")]
    ExpiredToken {
        /// Expiration instant carried by the token, in epoch seconds.
        exp: i64,
        /// Time the check was performed at, in epoch seconds.
        now: i64,
    },

    /// The verifier has no usable key source or collaborator.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No key with the token's `kid` exists in the published key set.
    #[error("no key with kid '{0}' in JWKS")]
    KeyNotFound(String),

    /// The published key is not an RSA key.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// A component of the published key is missing or unusable.
    #[error("invalid key component: {0}")]
    InvalidKeyComponent(String),

    /// The token declares an algorithm other than RS256.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not verify against the resolved key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The JWKS fetch or the user lookup failed.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] HttpError),
}

impl AuthError {
    /// Stable snake_case label of the error kind, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::ExpiredToken { .. } => "expired_token",
            Self::Configuration(_) => "configuration",
            Self::KeyNotFound(_) => "key_not_found",
            Self::UnsupportedKeyType(_) => "unsupported_key_type",
            Self::InvalidKeyComponent(_) => "invalid_key_component",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidSignature => "invalid_signature",
            Self::Upstream(_) => "upstream",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken(reason.into())
    }
}

/// Errors returned by the Backend API transport and the collaborators built on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HttpError {
    /// The API answered with a status code of 400 or above.
    #[error("API request failed with status code {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON document.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A request parameter was rejected before anything was sent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
