//! Role mappings API client.
//!
//! Talks to the internal security routes of the hosting application:
//! `GET/POST/DELETE /internal/security/role_mapping/{name}` and
//! `GET /internal/security/role_mapping`.

use super::client::{Credentials, IntegrationClient};
use crate::config::ApiConfig;
use crate::role_mapping::{RoleMapping, RoleMappingDocument};
use crate::store::RoleMappingStore;
use crate::Result;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "role_mapping_api";
const ROUTE: [&str; 3] = ["internal", "security", "role_mapping"];

fn mapping_route(name: &str) -> [&str; 4] {
    let [a, b, c] = ROUTE;
    [a, b, c, name]
}

/// Client for the role mappings API.
pub struct RoleMappingsClient {
    client: IntegrationClient,
}

impl RoleMappingsClient {
    /// Create a new client.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: IntegrationClient::new(base_url, timeout, default_user_agent())?,
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| crate::Error::config_key("No API base URL configured", "api.base_url"))?;

        let user_agent = config.user_agent.as_deref().unwrap_or(default_user_agent());
        let mut client = IntegrationClient::new(base_url, config.timeout(), user_agent)?;
        if let Some(username) = &config.username {
            client = client.with_credentials(Credentials {
                username: username.clone(),
                password: config.password.clone(),
            });
        }

        Ok(Self { client })
    }

    /// Get the underlying HTTP client.
    pub fn client(&self) -> &IntegrationClient {
        &self.client
    }
}

fn default_user_agent() -> &'static str {
    concat!("role-mapping-rules/", env!("CARGO_PKG_VERSION"))
}

/// The request body for create/update. The name travels in the path.
fn request_body(mapping: &RoleMapping) -> Result<Value> {
    let mut body = serde_json::to_value(mapping)?;
    if let Value::Object(object) = &mut body {
        object.remove("name");
    }
    Ok(body)
}

/// A single-mapping response is either `{ "<name>": { ... } }` or the bare
/// mapping, which may omit its name. Only the first shape is left keyed.
fn with_name(raw: Value, name: &str) -> Value {
    match raw {
        Value::Object(object) if is_keyed_by(&object, name) => Value::Object(object),
        Value::Object(mut object) => {
            object
                .entry("name")
                .or_insert_with(|| Value::String(name.to_string()));
            Value::Object(object)
        }
        other => other,
    }
}

fn is_keyed_by(object: &serde_json::Map<String, Value>, name: &str) -> bool {
    object.len() == 1 && matches!(object.get(name), Some(Value::Object(_)))
}

#[async_trait]
impl RoleMappingStore for RoleMappingsClient {
    async fn load(&self, name: &str) -> Result<RoleMapping> {
        let raw: Value = self
            .client
            .get(&mapping_route(name))
            .await
            .into_result(SERVICE, name)?;

        let mut mappings = RoleMappingDocument::from_value(with_name(raw, name))?.role_mappings;
        match mappings.iter().position(|m| m.name == name) {
            Some(i) => Ok(mappings.swap_remove(i)),
            None => Err(crate::Error::not_found(name)),
        }
    }

    async fn save(&self, mapping: &RoleMapping) -> Result<()> {
        mapping.validate()?;

        let body = request_body(mapping)?;
        let _: Value = self
            .client
            .post(&mapping_route(&mapping.name), &body)
            .await
            .into_result(SERVICE, &mapping.name)?;

        tracing::info!(name = %mapping.name, "Saved role mapping");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RoleMapping>> {
        let raw: Value = self.client.get(&ROUTE).await.into_result(SERVICE, "*")?;

        let mut mappings = RoleMappingDocument::from_value(raw)?.role_mappings;
        mappings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mappings)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let _: Value = self
            .client
            .delete(&mapping_route(name))
            .await
            .into_result(SERVICE, name)?;

        tracing::info!(name = %name, "Deleted role mapping");
        Ok(())
    }
}
