//! Common test utilities for bamctl tests
//!
//! `FakeBam` stands in for Address Manager: each test supplies a handler
//! that answers `invoke` calls, and every call is recorded for assertions.

#![allow(dead_code)] // These functions are used by various test files

use async_trait::async_trait;
use bamctl::api::{BamApi, Params};
use bamctl::classify::Scope;
use bamctl::error::Result;
use bamctl::input::{InputSource, TokenReader};
use serde_json::{Value, json};
use std::sync::Mutex;

pub const CONFIGURATION_ID: u64 = 100;
pub const VIEW_ID: u64 = 200;

type Handler = Box<dyn Fn(&str, &Params) -> Result<Value> + Send + Sync>;

/// One recorded `invoke`
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory backend answering through a test-supplied handler
pub struct FakeBam {
    handler: Handler,
    calls: Mutex<Vec<Call>>,
}

impl FakeBam {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Params) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }
}

#[async_trait]
impl BamApi for FakeBam {
    async fn invoke(&self, operation: &str, params: &Params) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            operation: operation.to_string(),
            params: params.as_slice().to_vec(),
        });
        (self.handler)(operation, params)
    }
}

/// Entity JSON as the backend sends it
pub fn entity(id: u64, name: &str, kind: &str, properties: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": kind,
        "properties": properties,
    })
}

/// The backend's "no such object" answer
pub fn sentinel() -> Value {
    json!({ "id": 0, "name": null, "type": null, "properties": null })
}

pub fn network(id: u64, cidr: &str) -> Value {
    entity(id, &format!("net-{}", id), "IP4Network", &format!("CIDR={}|", cidr))
}

pub fn block(id: u64, cidr: &str) -> Value {
    entity(id, &format!("block-{}", id), "IP4Block", &format!("CIDR={}|", cidr))
}

pub fn dhcp_range(id: u64, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "name": null,
        "type": "DHCP4Range",
        "properties": format!("start={}|end={}|", start, end),
    })
}

pub fn scope() -> Scope {
    Scope {
        configuration_id: CONFIGURATION_ID,
        view_id: Some(VIEW_ID),
    }
}

pub fn scope_without_view() -> Scope {
    Scope {
        configuration_id: CONFIGURATION_ID,
        view_id: None,
    }
}

/// A reader over the given lines
pub async fn lines(lines: &[&str]) -> TokenReader {
    InputSource::Literal(lines.join("\n")).open().await.unwrap()
}

/// Captured command output as text
pub fn output(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}
