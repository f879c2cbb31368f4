//! The backend operation surface.
//!
//! Everything in the crate talks to the IPAM backend through [`BamApi::invoke`].
//! [`client::BamClient`] implements it over REST; tests implement it in memory.

pub mod client;

use crate::entity::{Entity, EntityId, Properties};
use crate::error::{BamError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use tracing::warn;

pub use client::BamClient;

/// Entity type tags used by the lookups in this crate
pub mod types {
    pub const CONFIGURATION: &str = "Configuration";
    pub const VIEW: &str = "View";
    pub const ZONE: &str = "Zone";
    pub const IP4_BLOCK: &str = "IP4Block";
    pub const IP4_NETWORK: &str = "IP4Network";
    pub const IP4_ADDRESS: &str = "IP4Address";
    pub const DHCP4_RANGE: &str = "DHCP4Range";
    pub const SERVER: &str = "Server";
    pub const SERVER_INTERFACE: &str = "NetworkServerInterface";
}

/// HTTP verb used for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Pick the verb from the operation name's prefix
    pub fn for_operation(operation: &str) -> Self {
        if operation.starts_with("delete") {
            Method::Delete
        } else if operation.starts_with("add") || operation.starts_with("assign") {
            Method::Post
        } else if operation.starts_with("update") {
            Method::Put
        } else {
            Method::Get
        }
    }

    pub fn is_idempotent(self) -> bool {
        matches!(self, Method::Get)
    }
}

/// Ordered operation parameters, sent as a query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a parameter, replacing an existing value in place
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            // Never echo credentials into logs
            if key == "password" {
                write!(f, "{}=***", key)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
            first = false;
        }
        Ok(())
    }
}

/// The single generic entry point into the backend.
///
/// Returns the decoded JSON body: an entity object, a list of entities, a
/// bare id, or `null` for an empty body. Transport and authentication
/// failures are errors.
#[async_trait]
pub trait BamApi: Send + Sync {
    async fn invoke(&self, operation: &str, params: &Params) -> Result<Value>;
}

/// Typed wrappers over [`BamApi::invoke`] for the operations this crate uses.
///
/// Single-entity lookups return `None` where the backend answers with its
/// id-0 sentinel.
#[async_trait]
pub trait BamApiExt: BamApi {
    async fn get_entity(&self, operation: &str, params: Params) -> Result<Option<Entity>> {
        let value = self.invoke(operation, &params).await?;
        Entity::from_response(value)
            .map_err(|e| BamError::invalid_response(operation, e.to_string()))
    }

    async fn get_list(&self, operation: &str, params: Params) -> Result<Vec<Entity>> {
        let value = self.invoke(operation, &params).await?;
        Entity::list_from_response(value)
            .map_err(|e| BamError::invalid_response(operation, e.to_string()))
    }

    async fn get_entity_by_name(
        &self,
        parent_id: EntityId,
        name: &str,
        kind: &str,
    ) -> Result<Option<Entity>> {
        let params = Params::new()
            .set("parentId", parent_id)
            .set("name", name)
            .set("type", kind);
        self.get_entity("getEntityByName", params).await
    }

    async fn get_entity_by_id(&self, id: EntityId) -> Result<Option<Entity>> {
        self.get_entity("getEntityById", Params::new().set("id", id))
            .await
    }

    async fn get_entities_by_name(
        &self,
        parent_id: EntityId,
        name: &str,
        kind: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<Entity>> {
        let params = Params::new()
            .set("parentId", parent_id)
            .set("name", name)
            .set("type", kind)
            .set("start", start)
            .set("count", count);
        self.get_list("getEntitiesByName", params).await
    }

    async fn get_ip_ranged_by_ip(
        &self,
        container_id: EntityId,
        kind: &str,
        address: &str,
    ) -> Result<Option<Entity>> {
        let params = Params::new()
            .set("containerId", container_id)
            .set("type", kind)
            .set("address", address);
        self.get_entity("getIPRangedByIP", params).await
    }

    async fn get_ip4_address(
        &self,
        container_id: EntityId,
        address: &str,
    ) -> Result<Option<Entity>> {
        let params = Params::new()
            .set("containerId", container_id)
            .set("address", address);
        self.get_entity("getIP4Address", params).await
    }

    async fn get_parent(&self, entity_id: EntityId) -> Result<Option<Entity>> {
        self.get_entity("getParent", Params::new().set("entityId", entity_id))
            .await
    }

    async fn search_by_object_types(
        &self,
        keyword: &str,
        kinds: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<Entity>> {
        let params = Params::new()
            .set("keyword", keyword)
            .set("types", kinds)
            .set("start", start)
            .set("count", count);
        self.get_list("searchByObjectTypes", params).await
    }

    /// `server_id` of -1 returns options for every server
    async fn get_deployment_options(
        &self,
        entity_id: EntityId,
        option_types: &str,
        server_id: i64,
    ) -> Result<Vec<Entity>> {
        let params = Params::new()
            .set("entityId", entity_id)
            .set("optionTypes", option_types)
            .set("serverId", server_id);
        self.get_list("getDeploymentOptions", params).await
    }

    async fn get_dhcp_service_deployment_option(
        &self,
        entity_id: EntityId,
        name: &str,
        server_id: i64,
    ) -> Result<Option<Entity>> {
        let params = Params::new()
            .set("entityId", entity_id)
            .set("name", name)
            .set("serverId", server_id);
        self.get_entity("getDHCPServiceDeploymentOption", params)
            .await
    }

    async fn add_dhcp_service_deployment_option(
        &self,
        entity_id: EntityId,
        name: &str,
        value: &str,
        properties: &Properties,
    ) -> Result<EntityId> {
        let params = Params::new()
            .set("entityId", entity_id)
            .set("name", name)
            .set("value", value)
            .set("properties", properties);
        let value = self
            .invoke("addDHCPServiceDeploymentOption", &params)
            .await?;
        parse_new_id("addDHCPServiceDeploymentOption", value)
    }

    async fn get_deployment_roles(&self, entity_id: EntityId) -> Result<Vec<Entity>> {
        self.get_list(
            "getDeploymentRoles",
            Params::new().set("entityId", entity_id),
        )
        .await
    }

    async fn get_dhcp_deployment_role(
        &self,
        entity_id: EntityId,
        interface_id: EntityId,
    ) -> Result<Option<Entity>> {
        let params = Params::new()
            .set("entityId", entity_id)
            .set("serverInterfaceId", interface_id);
        self.get_entity("getDHCPDeploymentRole", params).await
    }

    async fn add_dhcp_deployment_role(
        &self,
        entity_id: EntityId,
        interface_id: EntityId,
        role_type: &str,
        properties: &Properties,
    ) -> Result<EntityId> {
        let params = Params::new()
            .set("entityId", entity_id)
            .set("serverInterfaceId", interface_id)
            .set("type", role_type)
            .set("properties", properties);
        let value = self.invoke("addDHCPDeploymentRole", &params).await?;
        parse_new_id("addDHCPDeploymentRole", value)
    }

    /// Delete an object. Returns the backend's message when the body is not
    /// empty or the delete was refused; transport and session errors still fail.
    async fn delete(&self, object_id: EntityId) -> Result<Option<String>> {
        let value = match self
            .invoke("delete", &Params::new().set("objectId", object_id))
            .await
        {
            Ok(value) => value,
            Err(BamError::Api { message, .. }) => {
                warn!("delete of {} refused: {}", object_id, message);
                return Ok(Some(message));
            }
            Err(err) => return Err(err),
        };
        Ok(match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }
}

impl<T: BamApi + ?Sized> BamApiExt for T {}

fn parse_new_id(operation: &str, value: Value) -> Result<EntityId> {
    let id = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match id {
        Some(id) if id != 0 => Ok(id),
        _ => Err(BamError::invalid_response(
            operation,
            format!("expected a new object id, got {}", value),
        )),
    }
}
