use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::StoreError;
use crate::config::IdentityConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub enabled: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `StoreError::NotFound` for unknown accounts; callers depend
    /// on telling that apart from provider outages.
    async fn get_user(&self, id: Uuid) -> Result<IdentityUser, StoreError>;

    /// Disable (never delete) the account. Idempotent: disabling an
    /// already-disabled account succeeds.
    async fn disable_user(&self, id: Uuid) -> Result<(), StoreError>;

    /// Check a password against the provider. `Ok(false)` means the
    /// credentials were rejected; errors mean the check could not be made.
    async fn verify_password(&self, id: Uuid, password: &str) -> Result<bool, StoreError>;
}

/// Keycloak-style identity provider spoken over its admin REST API.
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    realm: String,
    client_id: String,
    admin_token: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            realm: config.realm.clone(),
            client_id: config.client_id.clone(),
            admin_token: config.admin_token.clone(),
        }
    }

    fn user_url(&self, id: Uuid) -> String {
        format!("{}/admin/realms/{}/users/{id}", self.base_url, self.realm)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_user(&self, id: Uuid) -> Result<IdentityUser, StoreError> {
        let resp = self
            .http
            .get(self.user_url(id))
            .bearer_auth(&self.admin_token)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("identity lookup: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(StoreError::Backend(format!(
                "identity lookup returned {}",
                resp.status()
            )));
        }

        resp.json::<IdentityUser>()
            .await
            .map_err(|e| StoreError::Backend(format!("identity response: {e}")))
    }

    async fn disable_user(&self, id: Uuid) -> Result<(), StoreError> {
        let resp = self
            .http
            .put(self.user_url(id))
            .bearer_auth(&self.admin_token)
            .json(&json!({ "enabled": false }))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("identity disable: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(StoreError::Backend(format!(
                "identity disable returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn verify_password(&self, id: Uuid, password: &str) -> Result<bool, StoreError> {
        // The token endpoint authenticates by username, not id.
        let user = self.get_user(id).await?;

        let resp = self
            .http
            .post(format!(
                "{}/realms/{}/protocol/openid-connect/token",
                self.base_url, self.realm
            ))
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.client_id.as_str()),
                ("username", user.username.as_str()),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("password check: {e}")))?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::BAD_REQUEST => Ok(false),
            s => Err(StoreError::Backend(format!("password check returned {s}"))),
        }
    }
}
