//! # Session verification
//!
//! The verification pipeline runs strictly in order and stops at the first
//! failure:
//!
//! ```text
//! Parse -> CheckExpiry -> ResolveKey -> VerifySignature -> LookupUser -> Done
//! ```
//!
//! A [`SessionVerifier`] holds no mutable state; one instance can be shared
//! across tasks and threads.

use crate::claims::{check_expiry, unix_now, Claims};
use crate::client::{ApiClient, HttpJsonClient};
use crate::config::ClerkConfig;
use crate::error::AuthError;
use crate::jwks::{ApiJwks, JwksProvider};
use crate::parser::JwtParser;
use crate::resolver::{parse_public_key_pem, KeyResolver};
use crate::signature::verify_signature;
use crate::users::{ApiUsers, UserLookup};
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub user_id: String,
    pub user_banned: bool,
    pub claims: Claims,
}

/// Verifies session tokens and resolves the user they belong to.
#[derive(Clone)]
pub struct SessionVerifier {
    keys: KeyResolver,
    users: Arc<dyn UserLookup>,
}

impl fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl SessionVerifier {
    pub fn builder() -> SessionVerifierBuilder {
        SessionVerifierBuilder::default()
    }

    /// Wires a verifier to the Backend API described by `config`.
    ///
    /// The static key is used when `CLERK_JWT_KEY` is set; otherwise keys are
    /// resolved through `GET /jwks`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the static key cannot be parsed
    /// or the HTTP client cannot be built.
    pub fn from_config(config: &ClerkConfig) -> Result<Self, AuthError> {
        let client: Arc<dyn HttpJsonClient> = Arc::new(ApiClient::new(config)?);

        let mut builder = Self::builder().user_lookup(Arc::new(ApiUsers::new(client.clone())));
        builder = match config.jwt_key.as_deref() {
            Some(pem) => builder.static_key_pem(pem),
            None => builder.jwks_provider(Arc::new(ApiJwks::new(client))),
        };
        builder.build()
    }

    /// Verifies a token against the current time.
    ///
    /// # Errors
    ///
    /// See [`SessionVerifier::verify_at`].
    pub async fn verify(&self, token: &str) -> Result<VerificationResult, AuthError> {
        self.verify_at(token, unix_now()).await
    }

    /// Verifies the token carried in an `Authorization: Bearer ...` header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedToken`] if the bearer scheme is missing,
    /// otherwise the errors of [`SessionVerifier::verify_at`].
    pub async fn verify_bearer(&self, header_value: &str) -> Result<VerificationResult, AuthError> {
        let token = JwtParser::strip_bearer(header_value)?;
        self.verify(token).await
    }

    /// Verifies a token as of `now` (epoch seconds) and looks up its subject.
    ///
    /// # Errors
    ///
    /// Any stage failure, unchanged: [`AuthError::MalformedToken`],
    /// [`AuthError::ExpiredToken`], [`AuthError::KeyNotFound`],
    /// [`AuthError::UnsupportedAlgorithm`], [`AuthError::InvalidSignature`],
    /// the key conversion errors, or [`AuthError::Upstream`] when the JWKS
    /// fetch or the user lookup fails.
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<VerificationResult, AuthError> {
        let result = self.run(token, now).await;
        if let Err(e) = &result {
            tracing::warn!(kind = e.kind(), "Session verification failed: {}", e);
        }
        result
    }

    /// Runs the token checks (parse, expiry, key, signature) without the user lookup.
    ///
    /// # Errors
    ///
    /// The same as [`SessionVerifier::verify_at`], minus the user lookup failure.
    pub async fn verify_token(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let parsed = JwtParser::parse(token)?;

        check_expiry(&parsed.claims, now)?;

        let key = self.keys.resolve(&parsed.header).await?;

        let valid = verify_signature(
            &parsed.header.alg,
            parsed.signing_input.as_bytes(),
            &parsed.signature,
            &key,
        )?;
        if !valid {
            return Err(AuthError::InvalidSignature);
        }

        Ok(parsed.claims)
    }

    async fn run(&self, token: &str, now: i64) -> Result<VerificationResult, AuthError> {
        let claims = self.verify_token(token, now).await?;

        let sub = claims
            .sub()
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| AuthError::malformed("sub claim missing"))?;

        let user = self.users.get_user(sub).await?;

        tracing::info!("Session verified for user: {}", user.id);
        Ok(VerificationResult {
            user_banned: user.is_banned(),
            user_id: user.id,
            claims,
        })
    }
}

/// Assembles a [`SessionVerifier`] from its collaborators.
#[derive(Default)]
pub struct SessionVerifierBuilder {
    static_key: Option<Result<RsaPublicKey, AuthError>>,
    jwks: Option<Arc<dyn JwksProvider>>,
    users: Option<Arc<dyn UserLookup>>,
}

impl SessionVerifierBuilder {
    /// Uses a PEM public key for every token. Takes precedence over JWKS.
    pub fn static_key_pem(mut self, pem: &str) -> Self {
        self.static_key = Some(parse_public_key_pem(pem));
        self
    }

    /// Uses an already parsed public key for every token. Takes precedence over JWKS.
    pub fn static_key(mut self, key: RsaPublicKey) -> Self {
        self.static_key = Some(Ok(key));
        self
    }

    pub fn jwks_provider(mut self, provider: Arc<dyn JwksProvider>) -> Self {
        self.jwks = Some(provider);
        self
    }

    pub fn user_lookup(mut self, users: Arc<dyn UserLookup>) -> Self {
        self.users = Some(users);
        self
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if there is neither a static key
    /// nor a JWKS provider, if the static key is invalid, or if no user lookup
    /// was given.
    pub fn build(self) -> Result<SessionVerifier, AuthError> {
        let keys = match (self.static_key, self.jwks) {
            (Some(key), _) => KeyResolver::Static(key?),
            (None, Some(provider)) => KeyResolver::Jwks(provider),
            (None, None) => {
                return Err(AuthError::Configuration(
                    "neither a static key nor a JWKS provider is configured".to_string(),
                ))
            }
        };

        let users = self
            .users
            .ok_or_else(|| AuthError::Configuration("no user lookup configured".to_string()))?;

        Ok(SessionVerifier { keys, users })
    }
}
