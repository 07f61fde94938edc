//! Provenance recorder: a session's audit trail.
//!
//! The header fields are seeded once from the hosting environment
//! ([`ProvenanceSeed`]) when the session is created and never change.
//! `subactions` is append-only, one entry per submitted subjob.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Default `description` for a provenance record.
pub const DEFAULT_DESCRIPTION: &str = "KBase SDK method run via the KBase Execution Engine";

/// Context field carrying the submitted module's version.
pub const SERVICE_VER_FIELD: &str = "service_ver";

/// Environment-supplied header values for new provenance records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceSeed {
    pub description: String,
    pub service: String,
    pub method: String,
    pub service_ver: String,
    pub method_params: Value,
    pub input_ws_objects: Vec<String>,
}

impl Default for ProvenanceSeed {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            service: String::new(),
            method: String::new(),
            service_ver: String::new(),
            method_params: Value::Array(Vec::new()),
            input_ws_objects: Vec::new(),
        }
    }
}

/// One submitted subjob as it appears in the provenance trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAction {
    /// `"Module.method"` of the submitted call.
    pub name: String,
    pub ver: String,
    pub code_url: String,
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Creation time, milliseconds since the Unix epoch.
    pub epoch: i64,
    pub description: String,
    pub service: String,
    pub method: String,
    pub service_ver: String,
    pub method_params: Value,
    pub input_ws_objects: Vec<String>,
    subactions: Vec<SubAction>,
}

impl ProvenanceRecord {
    /// Build a fresh record from `seed` with an empty subaction list.
    pub fn init(seed: &ProvenanceSeed, epoch: i64) -> Self {
        Self {
            epoch,
            description: seed.description.clone(),
            service: seed.service.clone(),
            method: seed.method.clone(),
            service_ver: seed.service_ver.clone(),
            method_params: seed.method_params.clone(),
            input_ws_objects: seed.input_ws_objects.clone(),
            subactions: Vec::new(),
        }
    }

    pub fn subactions(&self) -> &[SubAction] {
        &self.subactions
    }

    /// Append a subaction for `module.sub_method`.
    ///
    /// `ver` comes from `context.service_ver`, which is required; `code_url`
    /// and `commit` are copied from the context when present.
    pub fn record_subaction(
        &mut self,
        module: &str,
        sub_method: &str,
        context: Option<&Value>,
    ) -> Result<&SubAction, CoreError> {
        let subaction = build_subaction(module, sub_method, context)?;
        self.subactions.push(subaction);
        Ok(&self.subactions[self.subactions.len() - 1])
    }
}

/// Build the [`SubAction`] for a submission without recording it.
pub fn build_subaction(
    module: &str,
    sub_method: &str,
    context: Option<&Value>,
) -> Result<SubAction, CoreError> {
    let field = |name: &str| {
        context
            .and_then(|ctx| ctx.get(name))
            .and_then(Value::as_str)
    };

    let ver = field(SERVICE_VER_FIELD).ok_or(CoreError::MissingContext {
        field: SERVICE_VER_FIELD,
    })?;

    Ok(SubAction {
        name: format!("{module}.{sub_method}"),
        ver: ver.to_string(),
        code_url: field("code_url").unwrap_or_default().to_string(),
        commit: field("commit").unwrap_or_default().to_string(),
    })
}
