//! Request validator: JSON schemas for the RPC envelope and `_check_job`
//! params, plus a small keyword evaluator over them.
//!
//! The evaluator understands only the keywords these schemas use (`type`,
//! `required`, `properties`, `const`, `pattern`, `minItems`, `maxItems`,
//! `items`). Keywords are checked in that order and the first violation
//! wins. Messages follow the wording clients of the callback server already
//! match on, e.g. `'method' is a required property`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CoreError;

/// Envelope schema every RPC body must satisfy.
pub static RPC_REQUEST_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "required": ["method"],
        "properties": {
            "version": {"const": "1.1"},
            "method": {
                "type": "string",
                "description": "Module name and method name to run.",
                "example": "AssemblyUtil.get_assembly_as_fasta",
                "pattern": r"^\w+\.\w+$"
            },
            "params": {
                "description": "Parameters for the object. Can be any JSON data."
            }
        }
    })
});

/// Applied only once routing has decided the call is `Module._check_job`:
/// `params` must be a one-element array holding the job id.
pub static CHECK_JOB_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "required": ["params"],
        "properties": {
            "params": {
                "type": "array",
                "minItems": 1,
                "maxItems": 1,
                "items": [{
                    "type": "string",
                    "title": "Job ID to check."
                }]
            }
        }
    })
});

/// Machine-readable detail of a failed schema check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    /// Human-readable description of the failure.
    pub message: String,
    /// The value that failed the check.
    pub instance: Value,
    /// Name of the violated keyword (`required`, `pattern`, ...).
    pub validator: String,
    /// The keyword's value in the schema.
    pub validator_value: Value,
    /// The (sub-)schema that contains the keyword.
    pub schema: Value,
}

/// Validate a raw request body against [`RPC_REQUEST_SCHEMA`].
pub fn validate_rpc_request(body: &Value) -> Result<(), CoreError> {
    validate(body, &RPC_REQUEST_SCHEMA)
}

/// Validate a `{"params": ...}` envelope against [`CHECK_JOB_SCHEMA`].
pub fn validate_check_job(envelope: &Value) -> Result<(), CoreError> {
    validate(envelope, &CHECK_JOB_SCHEMA)
}

/// Validate `instance` against `schema`, returning the first violation.
///
/// Fails with [`CoreError::Validation`] on a violation and
/// [`CoreError::Internal`] if the schema itself carries an invalid pattern.
pub fn validate(instance: &Value, schema: &Value) -> Result<(), CoreError> {
    let Some(keywords) = schema.as_object() else {
        return Ok(());
    };

    if let Some(expected) = keywords.get("type") {
        if let Some(name) = expected.as_str() {
            if !is_of_type(instance, name) {
                return Err(violation(
                    format!("{} is not of type {}", py_repr(instance), py_repr(expected)),
                    instance,
                    "type",
                    expected,
                    schema,
                ));
            }
        }
    }

    if let (Some(required), Some(object)) = (
        keywords.get("required").and_then(Value::as_array),
        instance.as_object(),
    ) {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                return Err(violation(
                    format!("'{name}' is a required property"),
                    instance,
                    "required",
                    &keywords["required"],
                    schema,
                ));
            }
        }
    }

    if let (Some(properties), Some(object)) = (
        keywords.get("properties").and_then(Value::as_object),
        instance.as_object(),
    ) {
        // Schema order; the workspace enables serde_json's `preserve_order`.
        for (name, subschema) in properties {
            if let Some(value) = object.get(name) {
                validate(value, subschema)?;
            }
        }
    }

    if let Some(expected) = keywords.get("const") {
        if instance != expected {
            return Err(violation(
                format!("{} was expected", py_repr(expected)),
                instance,
                "const",
                expected,
                schema,
            ));
        }
    }

    if let (Some(pattern), Some(text)) = (
        keywords.get("pattern").and_then(Value::as_str),
        instance.as_str(),
    ) {
        let re = Regex::new(pattern)
            .map_err(|e| CoreError::Internal(format!("Invalid schema pattern {pattern}: {e}")))?;
        if !re.is_match(text) {
            return Err(violation(
                format!("{} does not match {}", py_repr(instance), py_repr(&keywords["pattern"])),
                instance,
                "pattern",
                &keywords["pattern"],
                schema,
            ));
        }
    }

    if let Some(items) = instance.as_array() {
        if let Some(min) = keywords.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                return Err(violation(
                    format!("{} is too short", py_repr(instance)),
                    instance,
                    "minItems",
                    &keywords["minItems"],
                    schema,
                ));
            }
        }

        if let Some(max) = keywords.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                return Err(violation(
                    format!("{} is too long", py_repr(instance)),
                    instance,
                    "maxItems",
                    &keywords["maxItems"],
                    schema,
                ));
            }
        }

        match keywords.get("items") {
            // Tuple form: the n-th schema applies to the n-th item.
            Some(Value::Array(positional)) => {
                for (item, subschema) in items.iter().zip(positional) {
                    validate(item, subschema)?;
                }
            }
            Some(subschema) if subschema.is_object() => {
                for item in items {
                    validate(item, subschema)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn violation(
    message: String,
    instance: &Value,
    validator: &str,
    validator_value: &Value,
    schema: &Value,
) -> CoreError {
    SchemaViolation {
        message,
        instance: instance.clone(),
        validator: validator.to_string(),
        validator_value: validator_value.clone(),
        schema: schema.clone(),
    }
    .into()
}

fn is_of_type(instance: &Value, name: &str) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        "integer" => {
            instance.is_i64()
                || instance.is_u64()
                || instance.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => true,
    }
}

/// Render a JSON value the way validation messages quote instances:
/// single-quoted strings, `True`/`False`/`None`, `[a, b]` and `{'k': v}`.
pub fn py_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(py_repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote_str(k), py_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
