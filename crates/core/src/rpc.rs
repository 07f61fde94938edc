//! The JSON-RPC 1.1 style request envelope.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::CoreError;
use crate::schema::validate_rpc_request;

/// A validated RPC call.
///
/// Only constructed through [`RpcRequest::parse`], so `method` always holds
/// exactly two non-empty dot-separated tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub version: Option<String>,
    /// `"Module.method"`.
    pub method: String,
    /// `Some(Value::Null)` when the body carries `"params": null`.
    #[serde(default, deserialize_with = "present")]
    pub params: Option<Value>,
    /// Caller context; submissions need `service_ver` in here.
    #[serde(default)]
    pub context: Option<Value>,
    /// Opaque correlator, echoed back in responses.
    #[serde(default)]
    pub id: Option<Value>,
}

/// Keep an explicit `null` as `Some(Value::Null)`; only a missing key is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RpcRequest {
    /// Validate a raw body against the envelope schema and deserialize it.
    pub fn parse(body: Value) -> Result<Self, CoreError> {
        validate_rpc_request(&body)?;
        serde_json::from_value(body)
            .map_err(|e| CoreError::Internal(format!("Validated request failed to deserialize: {e}")))
    }

    /// Split `method` into `(module, method)`.
    pub fn module_and_method(&self) -> (&str, &str) {
        self.method.split_once('.').unwrap_or((self.method.as_str(), ""))
    }

    /// Look up a string field of `context`.
    pub fn context_str(&self, field: &str) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.get(field))
            .and_then(Value::as_str)
    }
}
