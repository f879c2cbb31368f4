//! Generic IPAM entities and the `key=value|` property codec.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Backend object identifier. Never zero: the backend's id 0 means "absent"
/// and is mapped to `None` before an [`Entity`] is built.
pub type EntityId = u64;

/// A typed, named, propertied object returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub properties: Properties,
    /// Fields outside the common shape, e.g. `value` on deployment options
    /// or `service` on deployment roles
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    /// Build an entity from a single-object response.
    ///
    /// `null`, an empty object, and the id-0 sentinel all mean "not found".
    pub fn from_response(value: Value) -> serde_json::Result<Option<Self>> {
        match &value {
            Value::Null => return Ok(None),
            Value::Object(obj) => match obj.get("id").and_then(Value::as_u64) {
                None | Some(0) => return Ok(None),
                Some(_) => {}
            },
            _ => {}
        }
        serde_json::from_value(value).map(Some)
    }

    /// Build entities from a list response, dropping sentinel entries
    pub fn list_from_response(value: Value) -> serde_json::Result<Vec<Self>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => {
                let mut entities = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(entity) = Self::from_response(item)? {
                        entities.push(entity);
                    }
                }
                Ok(entities)
            }
            other => Err(de::Error::custom(format!(
                "expected a list of entities, got {}",
                other
            ))),
        }
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    /// The `CIDR` property of networks and blocks
    pub fn cidr(&self) -> Option<&str> {
        self.property("CIDR")
    }

    /// A top-level string field outside the common shape
    pub fn field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// Ordered string properties, transmitted as `k1=v1|k2=v2|`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, String)>);

impl Properties {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Decode the wire form. Empty segments are skipped; a segment without
    /// `=` becomes a key with an empty value.
    pub fn decode(encoded: &str) -> Self {
        let entries = encoded
            .split('|')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (segment.to_string(), String::new()),
            })
            .collect();
        Self(entries)
    }

    /// Encode back to the wire form, keeping insertion order
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{}={}|", key, value))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, replacing an existing value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept the encoded string as well as an already-decoded object
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Properties::new()),
            Value::String(encoded) => Ok(Properties::decode(&encoded)),
            Value::Object(obj) => Ok(Properties(
                obj.into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k, s),
                        other => (k, other.to_string()),
                    })
                    .collect(),
            )),
            other => Err(de::Error::custom(format!(
                "invalid properties value: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_preserves_order() {
        let props = Properties::decode("CIDR=10.2.1.0/24|allowDuplicateHost=disable|inherit=true|");
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["CIDR", "allowDuplicateHost", "inherit"]);
        assert_eq!(props.get("CIDR"), Some("10.2.1.0/24"));
    }

    #[test]
    fn test_encode_keeps_insertion_order() {
        let mut props = Properties::decode("b=2|a=1|");
        props.insert("c", "3");
        props.insert("b", "20");
        assert_eq!(props.encode(), "b=20|a=1|c=3|");
    }

    #[test]
    fn test_object_properties_keep_wire_order() {
        let entity: Entity = serde_json::from_str(
            r#"{"id": 12, "name": "office", "type": "IP4Network",
                "properties": {"gateway": "10.2.1.1", "CIDR": "10.2.1.0/24", "inherit": true}}"#,
        )
        .unwrap();
        assert_eq!(
            entity.properties.encode(),
            "gateway=10.2.1.1|CIDR=10.2.1.0/24|inherit=true|"
        );
    }

    #[test]
    fn test_decode_handles_odd_segments() {
        let props = Properties::decode("flag||url=http://x/?a=b|");
        assert_eq!(props.get("flag"), Some(""));
        assert_eq!(props.get("url"), Some("http://x/?a=b"));
        assert_eq!(props.len(), 2);
        assert!(Properties::decode("").is_empty());
    }

    #[test]
    fn test_sentinel_response_is_none() {
        let value = json!({"id": 0, "name": null, "type": null, "properties": null});
        assert_eq!(Entity::from_response(value).unwrap(), None);
        assert_eq!(Entity::from_response(Value::Null).unwrap(), None);
        assert_eq!(Entity::from_response(json!({})).unwrap(), None);
    }

    #[test]
    fn test_entity_from_response() {
        let value = json!({
            "id": 22348235,
            "name": "vendor-encapsulated-options",
            "type": "DHCPClient",
            "value": "F1:04:8D:D5:98:4B",
            "properties": "inherited=false|"
        });
        let entity = Entity::from_response(value).unwrap().unwrap();
        assert_eq!(entity.id, 22348235);
        assert_eq!(entity.kind, "DHCPClient");
        assert_eq!(entity.field("value"), Some("F1:04:8D:D5:98:4B"));
        assert_eq!(entity.property("inherited"), Some("false"));
    }

    #[test]
    fn test_list_drops_sentinels() {
        let value = json!([
            {"id": 0, "name": null, "type": null, "properties": null},
            {"id": 7, "name": "r1", "type": "DHCP4Range", "properties": "start=10.0.0.10|end=10.0.0.20|"}
        ]);
        let list = Entity::list_from_response(value).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].property("end"), Some("10.0.0.20"));
    }
}
