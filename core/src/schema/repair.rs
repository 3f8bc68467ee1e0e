//! Schema repair for strict structured output
//!
//! Planner-authored JSON Schemas are frequently partial: missing `type`
//! fields, open objects, arrays without `items`, or a description pasted
//! where a schema belongs. Strict structured-output mode rejects all of
//! that, so every schema passes through [`repair`] before it reaches a
//! generative backend.
//!
//! Repair never fails. Whatever it is handed, it produces a usable
//! object-rooted schema plus a record of every change it made; a
//! completely unusable input degrades to a minimal empty object schema
//! and is flagged as such.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Synthetic envelope added when a non-object root schema is wrapped.
///
/// Strict mode requires an object at the root, so array roots are moved
/// under an `items` property and primitive roots under `value`. The same
/// kind must be used to strip the envelope from the model's response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapKind {
    #[default]
    None,
    Items,
    Value,
}

/// One change (or unfixable defect) observed while repairing a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairRecord {
    /// Dotted location within the schema, rooted at `root`.
    pub path: String,
    pub issue: String,
    pub fixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl RepairRecord {
    fn fixed(path: impl Into<String>, issue: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            issue: issue.into(),
            fixed: true,
            fix: Some(fix.into()),
        }
    }

    fn unfixed(path: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            issue: issue.into(),
            fixed: false,
            fix: None,
        }
    }
}

/// Result of [`repair`]: the normalized schema, the envelope applied at
/// the root (if any), and the full change log.
#[derive(Debug, Clone)]
pub struct RepairedSchema {
    pub schema: Value,
    pub wrap: WrapKind,
    pub records: Vec<RepairRecord>,
    /// True when the input was unusable and the minimal fallback schema
    /// was substituted.
    pub degraded: bool,
}

impl RepairedSchema {
    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }
}

/// Normalizes an arbitrary schema value for strict structured output.
///
/// Guarantees on the returned schema:
/// - the root is object-typed (wrapping array/primitive roots, see
///   [`WrapKind`]);
/// - every object node carries `additionalProperties: false` and a
///   `required` array covering all of its property names, with existing
///   entries preserved;
/// - every array node has an `items` schema;
/// - every node has a `type`, inferred from its shape when absent.
pub fn repair(schema: &Value) -> RepairedSchema {
    let mut records = Vec::new();

    if schema.is_null() {
        records.push(RepairRecord::unfixed("root", "schema is null"));
        return RepairedSchema {
            schema: minimal_object_schema(),
            wrap: WrapKind::None,
            records,
            degraded: true,
        };
    }

    let mut repaired = repair_node(schema, "root", &mut records);

    let wrap = match repaired.get("type").and_then(Value::as_str) {
        Some("object") => WrapKind::None,
        Some("array") => {
            records.push(RepairRecord::fixed(
                "root",
                "root schema is array type",
                "wrapped in object container",
            ));
            repaired = wrap_root(repaired, "items");
            WrapKind::Items
        }
        other => {
            let kind = other.unwrap_or("unknown");
            records.push(RepairRecord::fixed(
                "root",
                format!("root schema is {kind} type"),
                "wrapped in object container",
            ));
            repaired = wrap_root(repaired, "value");
            WrapKind::Value
        }
    };

    RepairedSchema {
        schema: repaired,
        wrap,
        records,
        degraded: false,
    }
}

/// Strips the synthetic `items`/`value` envelope from a model response.
///
/// If the response does not actually carry the envelope key, it is
/// returned unchanged rather than replaced with nothing.
pub fn unwrap_envelope(value: Value, wrap: WrapKind) -> Value {
    let key = match wrap {
        WrapKind::None => return value,
        WrapKind::Items => "items",
        WrapKind::Value => "value",
    };
    match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// The fallback schema substituted for unusable inputs.
pub fn minimal_object_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": [],
        "additionalProperties": false
    })
}

fn wrap_root(schema: Value, key: &str) -> Value {
    let mut properties = Map::new();
    properties.insert(key.to_string(), schema);
    json!({
        "type": "object",
        "properties": properties,
        "required": [key],
        "additionalProperties": false
    })
}

fn repair_node(schema: &Value, path: &str, records: &mut Vec<RepairRecord>) -> Value {
    match schema {
        Value::String(text) => {
            records.push(RepairRecord::fixed(
                path,
                "schema is a plain string (possibly a misplaced description)",
                "converted to string schema",
            ));
            json!({ "type": "string", "description": text })
        }
        Value::Object(map) => repair_object(map, path, records),
        other => {
            records.push(RepairRecord::fixed(
                path,
                format!("schema is not an object (got {})", value_kind(other)),
                "converted to string type",
            ));
            json!({ "type": "string", "description": format!("Value at {path}") })
        }
    }
}

fn repair_object(map: &Map<String, Value>, path: &str, records: &mut Vec<RepairRecord>) -> Value {
    let mut result = map.clone();

    let ty: Option<String> = match result.get("type").cloned() {
        None | Some(Value::Null) => {
            let inferred = infer_type(&result);
            records.push(RepairRecord::fixed(
                path,
                "missing type field",
                format!("inferred type: {inferred}"),
            ));
            result.insert("type".to_string(), Value::String(inferred.to_string()));
            Some(inferred.to_string())
        }
        Some(Value::String(t)) => Some(t),
        // Unusual but legal forms such as type arrays are left untouched.
        Some(_) => None,
    };

    if ty.as_deref() == Some("object") {
        repair_object_shape(&mut result, path, records);
    }

    if ty.as_deref() == Some("array") {
        repair_array_shape(&mut result, path, records);
    }

    for key in ["anyOf", "oneOf", "allOf"] {
        let Some(value) = result.get(key).cloned() else {
            continue;
        };
        match value {
            Value::Array(branches) => {
                let repaired: Vec<Value> = branches
                    .iter()
                    .enumerate()
                    .map(|(i, branch)| repair_node(branch, &format!("{path}.{key}[{i}]"), records))
                    .collect();
                result.insert(key.to_string(), Value::Array(repaired));
            }
            _ => {
                records.push(RepairRecord::fixed(
                    path,
                    format!("{key} is not an array"),
                    format!("removed invalid {key}"),
                ));
                result.remove(key);
            }
        }
    }

    Value::Object(result)
}

fn repair_object_shape(result: &mut Map<String, Value>, path: &str, records: &mut Vec<RepairRecord>) {
    match result.get("additionalProperties").cloned() {
        Some(Value::Bool(false)) => {}
        Some(_) => {
            records.push(RepairRecord::fixed(
                path,
                "additionalProperties is not false",
                "set additionalProperties: false",
            ));
            result.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        None => {
            records.push(RepairRecord::fixed(
                path,
                "missing additionalProperties: false",
                "added additionalProperties: false",
            ));
            result.insert("additionalProperties".to_string(), Value::Bool(false));
        }
    }

    let properties = match result.get("properties").cloned() {
        Some(Value::Object(props)) => props,
        _ => {
            records.push(RepairRecord::fixed(
                path,
                "object type with no properties",
                "added empty properties object",
            ));
            result.insert("properties".to_string(), Value::Object(Map::new()));
            result.insert("required".to_string(), json!([]));
            return;
        }
    };

    let mut new_properties = Map::new();
    let mut property_keys: Vec<String> = Vec::with_capacity(properties.len());

    for (key, value) in properties {
        let prop_path = format!("{path}.properties.{key}");
        let mut repaired = match &value {
            Value::String(text) => {
                records.push(RepairRecord::fixed(
                    &prop_path,
                    "property value is a string instead of a schema object",
                    "converted to string schema",
                ));
                json!({ "type": "string", "description": text })
            }
            Value::Object(_) => repair_node(&value, &prop_path, records),
            other => {
                records.push(RepairRecord::fixed(
                    &prop_path,
                    format!("invalid property value ({})", value_kind(other)),
                    "converted to string schema",
                ));
                json!({ "type": "string", "description": format!("Property {key}") })
            }
        };

        if repaired.get("description").is_none() {
            if let Some(obj) = repaired.as_object_mut() {
                obj.insert(
                    "description".to_string(),
                    Value::String(format!("Value for {key}")),
                );
                records.push(RepairRecord::fixed(
                    &prop_path,
                    "property missing description",
                    "added default description",
                ));
            }
        }

        property_keys.push(key.clone());
        new_properties.insert(key, repaired);
    }

    result.insert("properties".to_string(), Value::Object(new_properties));

    match result.get("required").cloned() {
        Some(Value::Array(existing)) => {
            let mut required: Vec<String> = Vec::new();
            for entry in &existing {
                if let Some(name) = entry.as_str() {
                    if !required.iter().any(|r| r == name) {
                        required.push(name.to_string());
                    }
                }
            }
            let missing: Vec<String> = property_keys
                .iter()
                .filter(|key| !required.contains(key))
                .cloned()
                .collect();
            if !missing.is_empty() {
                records.push(RepairRecord::fixed(
                    path,
                    "required array incomplete",
                    format!("added missing keys: {}", missing.join(", ")),
                ));
                required.extend(missing);
            }
            result.insert(
                "required".to_string(),
                Value::Array(required.into_iter().map(Value::String).collect()),
            );
        }
        _ => {
            records.push(RepairRecord::fixed(
                path,
                "missing or invalid required array",
                "added all properties to required",
            ));
            result.insert(
                "required".to_string(),
                Value::Array(property_keys.into_iter().map(Value::String).collect()),
            );
        }
    }
}

fn repair_array_shape(result: &mut Map<String, Value>, path: &str, records: &mut Vec<RepairRecord>) {
    match result.get("items").cloned() {
        None | Some(Value::Null) => {
            records.push(RepairRecord::fixed(
                path,
                "array missing items schema",
                "added default string items",
            ));
            result.insert(
                "items".to_string(),
                json!({ "type": "string", "description": "Array item" }),
            );
        }
        Some(items) => {
            let repaired = repair_node(&items, &format!("{path}.items"), records);
            result.insert("items".to_string(), repaired);
        }
    }
}

/// Type inference for schemas missing a `type` field, in fixed priority
/// order: properties, items, enum, numeric bounds, string constraints,
/// combinator first branch, then string as the last resort.
fn infer_type(map: &Map<String, Value>) -> &'static str {
    if map.contains_key("properties") {
        return "object";
    }
    if map.contains_key("items") {
        return "array";
    }
    if map.contains_key("enum") {
        return "string";
    }
    if map.contains_key("minimum") || map.contains_key("maximum") {
        return "number";
    }
    if map.contains_key("minLength") || map.contains_key("maxLength") || map.contains_key("pattern")
    {
        return "string";
    }
    for key in ["anyOf", "oneOf", "allOf"] {
        if let Some(Value::Array(branches)) = map.get(key) {
            match branches.first() {
                Some(Value::Object(first)) => return infer_type(first),
                Some(_) => return "string",
                None => {}
            }
        }
    }
    "string"
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
