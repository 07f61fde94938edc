//! Method router: turns a validated `"Module.method"` into a [`RpcRoute`].
//!
//! Rules, in priority order:
//!
//! 1. `CallbackServer.status` -> [`RpcRoute::Status`]
//! 2. `CallbackServer.get_provenance` -> [`RpcRoute::GetProvenance`]
//! 3. `Module._<name>_submit` -> [`RpcRoute::Submit`] for sub-method `<name>`
//! 4. `Module._check_job` -> [`RpcRoute::CheckJob`], once `params` passes
//!    [`CHECK_JOB_SCHEMA`](crate::schema::CHECK_JOB_SCHEMA)
//! 5. anything else -> [`RpcRoute::Unrecognized`]
//!
//! A misspelled suffix (`_submitt`, `_checkjob`) is not diagnosed; it simply
//! lands in rule 5.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::rpc::RpcRequest;
use crate::schema::validate_check_job;
use crate::types::JobId;

/// Module name reserved for the coordinator's own methods.
pub const CALLBACK_SERVER_MODULE: &str = "CallbackServer";

/// Method suffix rule for subjob submissions.
static SUBMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_(.+)_submit$").expect("valid regex"));

/// Method name for job status checks.
pub const CHECK_JOB_METHOD: &str = "_check_job";

/// Routing decision for one RPC call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcRoute {
    Status,
    GetProvenance,
    Submit { module: String, sub_method: String },
    CheckJob { job_id: JobId },
    Unrecognized,
}

/// Decide how to handle `request`.
///
/// Only fails when the call is a job check whose `params` do not match the
/// check-job schema.
pub fn route(request: &RpcRequest) -> Result<RpcRoute, CoreError> {
    let (module, method) = request.module_and_method();

    if module == CALLBACK_SERVER_MODULE {
        match method {
            "status" => return Ok(RpcRoute::Status),
            "get_provenance" => return Ok(RpcRoute::GetProvenance),
            _ => {}
        }
    }

    if let Some(sub_method) = submitted_sub_method(method) {
        return Ok(RpcRoute::Submit {
            module: module.to_string(),
            sub_method: sub_method.to_string(),
        });
    }

    if method == CHECK_JOB_METHOD {
        let mut envelope = Map::new();
        if let Some(params) = &request.params {
            envelope.insert("params".to_string(), params.clone());
        }
        let envelope = Value::Object(envelope);
        validate_check_job(&envelope)?;

        let job_id = envelope["params"][0]
            .as_str()
            .ok_or_else(|| CoreError::Internal("Validated job id is not a string".into()))?;
        return Ok(RpcRoute::CheckJob {
            job_id: job_id.to_string(),
        });
    }

    Ok(RpcRoute::Unrecognized)
}

/// Extract `<name>` from a method named `_<name>_submit`.
pub fn submitted_sub_method(method: &str) -> Option<&str> {
    SUBMIT_RE
        .captures(method)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn route_body(body: Value) -> Result<RpcRoute, CoreError> {
        route(&RpcRequest::parse(body).unwrap())
    }

    #[test]
    fn status_ignores_params() {
        assert_eq!(
            route_body(json!({"method": "CallbackServer.status", "params": [1, 2, 3]})).unwrap(),
            RpcRoute::Status
        );
    }

    #[test]
    fn get_provenance() {
        assert_eq!(
            route_body(json!({"method": "CallbackServer.get_provenance"})).unwrap(),
            RpcRoute::GetProvenance
        );
    }

    #[test]
    fn submit_captures_sub_method() {
        assert_eq!(
            route_body(json!({"method": "AssemblyUtil._save_assembly_as_fasta_submit"})).unwrap(),
            RpcRoute::Submit {
                module: "AssemblyUtil".into(),
                sub_method: "save_assembly_as_fasta".into(),
            }
        );
    }

    #[test]
    fn callback_server_module_can_submit() {
        assert_matches!(
            route_body(json!({"method": "CallbackServer._run_submit"})).unwrap(),
            RpcRoute::Submit { sub_method, .. } if sub_method == "run"
        );
    }

    #[test]
    fn check_job_extracts_id() {
        assert_eq!(
            route_body(json!({"method": "Xyz._check_job", "params": ["1"]})).unwrap(),
            RpcRoute::CheckJob { job_id: "1".into() }
        );
    }

    #[test]
    fn check_job_without_params_is_a_validation_error() {
        let err = route_body(json!({"method": "Xyz._check_job"})).unwrap_err();
        assert_eq!(err.to_string(), "'params' is a required property");
    }

    #[test]
    fn check_job_with_null_params_fails_the_type_check() {
        let err = route_body(json!({"method": "Xyz._check_job", "params": null})).unwrap_err();
        let CoreError::Validation(violation) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(violation.message, "None is not of type 'array'");
        assert_eq!(violation.validator, "type");
        assert_eq!(violation.instance, Value::Null);
        assert_eq!(violation.schema["minItems"], 1);
    }

    #[test]
    fn check_job_with_empty_params_is_too_short() {
        let err = route_body(json!({"method": "Xyz._check_job", "params": []})).unwrap_err();
        assert_eq!(err.to_string(), "[] is too short");
    }

    #[test]
    fn misspelled_suffixes_fall_through() {
        for method in ["M._x_submitt", "M.x_submit", "M.__submit", "M._checkjob", "M.check_job"] {
            assert_eq!(
                route_body(json!({"method": method})).unwrap(),
                RpcRoute::Unrecognized,
                "{method}"
            );
        }
    }

    #[test]
    fn other_callback_server_methods_are_unrecognized() {
        assert_eq!(
            route_body(json!({"method": "CallbackServer.shutdown"})).unwrap(),
            RpcRoute::Unrecognized
        );
    }

    #[test]
    fn submitted_sub_method_keeps_inner_underscores() {
        assert_eq!(submitted_sub_method("_a_b_c_submit"), Some("a_b_c"));
        assert_eq!(submitted_sub_method("_submit"), None);
    }
}
