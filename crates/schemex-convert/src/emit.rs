//! JSON Schema (draft-07) emission.

use serde_json::{json, Map, Value};

use crate::node::{json_kind, NodeKind, NumberChecks, SchemaNode, StringChecks};

/// Value of the `$schema` keyword placed on every root document.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Emit the JSON Schema for a node, without the `$schema` keyword.
pub fn to_json_schema(node: &SchemaNode) -> Value {
    let mut schema = emit_kind(&node.kind);

    if node.nullable {
        schema = make_nullable(schema, &node.kind);
    }
    if let Some(description) = &node.description {
        schema.insert("description".to_string(), Value::String(description.clone()));
    }
    if let Some(default) = &node.default {
        schema.insert("default".to_string(), default.clone());
    }

    Value::Object(schema)
}

fn emit_kind(kind: &NodeKind) -> Map<String, Value> {
    let mut schema = Map::new();

    match kind {
        NodeKind::String(checks) => {
            schema.insert("type".to_string(), json!("string"));
            emit_string_checks(&mut schema, checks);
        }
        NodeKind::Number { integer, checks } => {
            let ty = if *integer { "integer" } else { "number" };
            schema.insert("type".to_string(), json!(ty));
            emit_number_checks(&mut schema, checks);
        }
        NodeKind::Boolean => {
            schema.insert("type".to_string(), json!("boolean"));
        }
        NodeKind::Null => {
            schema.insert("type".to_string(), json!("null"));
        }
        NodeKind::Any => {}
        NodeKind::Literal(value) => {
            // Objects and arrays only get `const`
            if matches!(
                value,
                Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null
            ) {
                schema.insert("type".to_string(), json!(json_kind(value)));
            }
            schema.insert("const".to_string(), value.clone());
        }
        NodeKind::Enum(values) => {
            schema.insert("type".to_string(), json!("string"));
            schema.insert("enum".to_string(), json!(values));
        }
        NodeKind::Array {
            element,
            min_items,
            max_items,
        } => {
            schema.insert("type".to_string(), json!("array"));
            schema.insert("items".to_string(), to_json_schema(element));
            if let Some(min) = min_items {
                schema.insert("minItems".to_string(), json!(min));
            }
            if let Some(max) = max_items {
                schema.insert("maxItems".to_string(), json!(max));
            }
        }
        NodeKind::Object { shape, passthrough } => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for (name, field) in shape {
                properties.insert(name.clone(), to_json_schema(field));
                if !field.optional {
                    required.push(Value::String(name.clone()));
                }
            }

            schema.insert("type".to_string(), json!("object"));
            schema.insert("properties".to_string(), Value::Object(properties));
            if !required.is_empty() {
                schema.insert("required".to_string(), Value::Array(required));
            }
            if !passthrough {
                schema.insert("additionalProperties".to_string(), json!(false));
            }
        }
        NodeKind::Record(values) => {
            schema.insert("type".to_string(), json!("object"));
            schema.insert("additionalProperties".to_string(), to_json_schema(values));
        }
        NodeKind::Union(options) => {
            let options = options.iter().map(to_json_schema).collect();
            schema.insert("anyOf".to_string(), Value::Array(options));
        }
    }

    schema
}

fn emit_string_checks(schema: &mut Map<String, Value>, checks: &StringChecks) {
    if let Some(min) = checks.min_length {
        schema.insert("minLength".to_string(), json!(min));
    }
    if let Some(max) = checks.max_length {
        schema.insert("maxLength".to_string(), json!(max));
    }
    if let Some(pattern) = &checks.pattern {
        schema.insert("pattern".to_string(), json!(pattern));
    }
    if let Some(format) = &checks.format {
        schema.insert("format".to_string(), json!(format));
    }
}

fn emit_number_checks(schema: &mut Map<String, Value>, checks: &NumberChecks) {
    let bounds = [
        ("minimum", &checks.minimum),
        ("maximum", &checks.maximum),
        ("exclusiveMinimum", &checks.exclusive_minimum),
        ("exclusiveMaximum", &checks.exclusive_maximum),
    ];
    for (keyword, bound) in bounds {
        if let Some(bound) = bound {
            schema.insert(keyword.to_string(), bound.clone());
        }
    }
}

/// Widen a schema to also accept `null`.
///
/// A plain `type` keyword becomes a type list; schemas whose values are pinned
/// by `const`/`enum`, or that have no single type, are wrapped in `anyOf`.
fn make_nullable(mut schema: Map<String, Value>, kind: &NodeKind) -> Map<String, Value> {
    let pinned = matches!(kind, NodeKind::Literal(_) | NodeKind::Enum(_));
    let ty = schema.get("type").and_then(Value::as_str).map(str::to_string);

    match ty.as_deref() {
        Some("null") => schema,
        Some(ty) if !pinned => {
            schema.insert("type".to_string(), json!([ty, "null"]));
            schema
        }
        _ => {
            let mut wrapped = Map::new();
            wrapped.insert(
                "anyOf".to_string(),
                json!([Value::Object(schema), { "type": "null" }]),
            );
            wrapped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(value: Value) -> Value {
        to_json_schema(&SchemaNode::parse(&value).unwrap())
    }

    #[test]
    fn test_nullable_primitive_uses_type_list() {
        let schema = emit(json!({ "type": "string", "nullable": true }));
        assert_eq!(schema, json!({ "type": ["string", "null"] }));
    }

    #[test]
    fn test_nullable_enum_uses_any_of() {
        let schema = emit(json!({ "type": "enum", "values": ["a", "b"], "nullable": true }));
        assert_eq!(
            schema,
            json!({
                "anyOf": [
                    { "type": "string", "enum": ["a", "b"] },
                    { "type": "null" }
                ]
            })
        );
    }

    #[test]
    fn test_literal() {
        assert_eq!(
            emit(json!({ "type": "literal", "value": 3 })),
            json!({ "type": "number", "const": 3 })
        );
    }

    #[test]
    fn test_number_bounds_keep_integers() {
        let schema = emit(json!({ "type": "integer", "minimum": 0, "maximum": 150 }));
        assert_eq!(schema.to_string(), r#"{"type":"integer","minimum":0,"maximum":150}"#);
    }

    #[test]
    fn test_passthrough_object_allows_extra_keys() {
        let schema = emit(json!({ "type": "object", "passthrough": true }));
        assert_eq!(schema, json!({ "type": "object", "properties": {} }));
    }

    #[test]
    fn test_description_and_default() {
        let schema = emit(json!({
            "type": "boolean",
            "description": "Enable the thing",
            "default": false
        }));
        assert_eq!(
            schema,
            json!({ "type": "boolean", "description": "Enable the thing", "default": false })
        );
    }
}
