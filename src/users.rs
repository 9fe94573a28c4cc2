//! User lookup through the Backend API.

use crate::client::HttpJsonClient;
use crate::error::HttpError;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// The parts of a Clerk user object the verifier relies on.
///
/// All other fields of the API response are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub banned: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Whether the user is banned; an absent flag means not banned.
    pub fn is_banned(&self) -> bool {
        self.banned.unwrap_or(false)
    }
}

/// Resolves a user ID to its account record.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Fetches the user with the given ID.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the user cannot be fetched, including when it
    /// does not exist.
    async fn get_user(&self, user_id: &str) -> Result<UserRecord, HttpError>;
}

/// [`UserLookup`] backed by `GET /users/{id}` on the Backend API.
#[derive(Clone)]
pub struct ApiUsers {
    client: Arc<dyn HttpJsonClient>,
}

impl ApiUsers {
    pub fn new(client: Arc<dyn HttpJsonClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserLookup for ApiUsers {
    async fn get_user(&self, user_id: &str) -> Result<UserRecord, HttpError> {
        validate_id(user_id, "user ID")?;

        let body = self
            .client
            .request(Method::GET, &format!("/users/{user_id}"), None)
            .await?;

        serde_json::from_value(body)
            .map_err(|e| HttpError::Decode(format!("Failed to parse user response: {e}")))
    }
}

/// Checks that an identifier is safe to embed in a request path.
///
/// # Errors
///
/// Returns [`HttpError::InvalidParameter`] if the ID is empty or contains
/// characters outside `[A-Za-z0-9_.-]`.
pub fn validate_id(id: &str, id_name: &str) -> Result<(), HttpError> {
    if id.is_empty() {
        return Err(HttpError::InvalidParameter(format!("{id_name} cannot be empty")));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(HttpError::InvalidParameter(format!(
            "{id_name} contains invalid characters"
        )));
    }
    Ok(())
}
