//! Declarative schema descriptions.
//!
//! A description is a mapping with a `type` key plus type-specific keys:
//!
//! ```yaml
//! type: object
//! shape:
//!   name: { type: string }
//!   age: { type: number, optional: true }
//! ```

use serde_json::{Map, Value};

use crate::error::{ConvertError, Result};

/// A parsed schema description.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    /// Excluded from the enclosing object's `required` list.
    pub optional: bool,
    /// Also accepts `null`.
    pub nullable: bool,
    pub description: Option<String>,
    pub default: Option<Value>,
}

/// The type-specific part of a schema description.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    String(StringChecks),
    Number { integer: bool, checks: NumberChecks },
    Boolean,
    Null,
    /// Accepts anything (`any` and `unknown`).
    Any,
    Literal(Value),
    Enum(Vec<String>),
    Array {
        element: Box<SchemaNode>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    Object {
        /// Fields in declaration order.
        shape: Vec<(String, SchemaNode)>,
        passthrough: bool,
    },
    Record(Box<SchemaNode>),
    Union(Vec<SchemaNode>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringChecks {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,
}

/// Numeric bounds, kept as the JSON numbers they were written as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberChecks {
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub exclusive_minimum: Option<Value>,
    pub exclusive_maximum: Option<Value>,
}

impl SchemaNode {
    /// Parse a schema description rooted at `$`.
    pub fn parse(value: &Value) -> Result<SchemaNode> {
        parse_at(value, "$")
    }
}

fn parse_at(value: &Value, path: &str) -> Result<SchemaNode> {
    let map = value.as_object().ok_or_else(|| ConvertError::NotASchema {
        path: path.to_string(),
        found: json_kind(value),
    })?;

    let ty = match map.get("type") {
        Some(Value::String(ty)) => ty.as_str(),
        Some(_) => return Err(ConvertError::invalid_field(path, "type", "expected a string")),
        None => {
            return Err(ConvertError::MissingType {
                path: path.to_string(),
            })
        }
    };

    let kind = match ty {
        "string" => NodeKind::String(StringChecks {
            min_length: field_u64(map, "minLength", path)?,
            max_length: field_u64(map, "maxLength", path)?,
            pattern: field_string(map, "pattern", path)?,
            format: field_string(map, "format", path)?,
        }),
        "number" | "integer" => NodeKind::Number {
            integer: ty == "integer" || field_bool(map, "int", path)?,
            checks: NumberChecks {
                minimum: field_number(map, "minimum", path)?,
                maximum: field_number(map, "maximum", path)?,
                exclusive_minimum: field_number(map, "exclusiveMinimum", path)?,
                exclusive_maximum: field_number(map, "exclusiveMaximum", path)?,
            },
        },
        "boolean" => NodeKind::Boolean,
        "null" => NodeKind::Null,
        "any" | "unknown" => NodeKind::Any,
        "literal" => {
            let value = map
                .get("value")
                .ok_or_else(|| ConvertError::invalid_field(path, "value", "literal needs a value"))?;
            NodeKind::Literal(value.clone())
        }
        "enum" => NodeKind::Enum(parse_enum_values(map, path)?),
        "array" => {
            let element = map
                .get("element")
                .ok_or_else(|| ConvertError::invalid_field(path, "element", "array needs an element schema"))?;
            NodeKind::Array {
                element: Box::new(parse_at(element, &format!("{}.element", path))?),
                min_items: field_u64(map, "minItems", path)?,
                max_items: field_u64(map, "maxItems", path)?,
            }
        }
        "object" => NodeKind::Object {
            shape: parse_shape(map, path)?,
            passthrough: field_bool(map, "passthrough", path)?,
        },
        "record" => {
            let values = match map.get("values") {
                Some(values) => parse_at(values, &format!("{}.values", path))?,
                None => SchemaNode::from_kind(NodeKind::Any),
            };
            NodeKind::Record(Box::new(values))
        }
        "union" => NodeKind::Union(parse_options(map, path)?),
        other => {
            return Err(ConvertError::UnknownType {
                path: path.to_string(),
                ty: other.to_string(),
            })
        }
    };

    Ok(SchemaNode {
        kind,
        optional: field_bool(map, "optional", path)?,
        nullable: field_bool(map, "nullable", path)?,
        description: field_string(map, "description", path)?,
        default: map.get("default").cloned(),
    })
}

impl SchemaNode {
    fn from_kind(kind: NodeKind) -> Self {
        SchemaNode {
            kind,
            optional: false,
            nullable: false,
            description: None,
            default: None,
        }
    }
}

fn parse_shape(map: &Map<String, Value>, path: &str) -> Result<Vec<(String, SchemaNode)>> {
    let shape = match map.get("shape") {
        None => return Ok(Vec::new()),
        Some(Value::Object(shape)) => shape,
        Some(_) => return Err(ConvertError::invalid_field(path, "shape", "expected a mapping of fields")),
    };

    shape
        .iter()
        .map(|(name, field)| {
            let node = parse_at(field, &format!("{}.shape.{}", path, name))?;
            Ok((name.clone(), node))
        })
        .collect()
}

fn parse_options(map: &Map<String, Value>, path: &str) -> Result<Vec<SchemaNode>> {
    let options = match map.get("options") {
        Some(Value::Array(options)) if !options.is_empty() => options,
        _ => return Err(ConvertError::invalid_field(path, "options", "union needs a non-empty list")),
    };

    options
        .iter()
        .enumerate()
        .map(|(i, option)| parse_at(option, &format!("{}.options[{}]", path, i)))
        .collect()
}

fn parse_enum_values(map: &Map<String, Value>, path: &str) -> Result<Vec<String>> {
    let values = match map.get("values") {
        Some(Value::Array(values)) if !values.is_empty() => values,
        _ => return Err(ConvertError::invalid_field(path, "values", "enum needs a non-empty list")),
    };

    values
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| ConvertError::invalid_field(path, "values", "enum values must be strings"))
        })
        .collect()
}

fn field_bool(map: &Map<String, Value>, field: &str, path: &str) -> Result<bool> {
    match map.get(field) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ConvertError::invalid_field(path, field, "expected a boolean")),
    }
}

fn field_string(map: &Map<String, Value>, field: &str, path: &str) -> Result<Option<String>> {
    match map.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConvertError::invalid_field(path, field, "expected a string")),
    }
}

fn field_u64(map: &Map<String, Value>, field: &str, path: &str) -> Result<Option<u64>> {
    match map.get(field) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| ConvertError::invalid_field(path, field, "expected a non-negative integer")),
    }
}

fn field_number(map: &Map<String, Value>, field: &str, path: &str) -> Result<Option<Value>> {
    match map.get(field) {
        None => Ok(None),
        Some(v @ Value::Number(_)) => Ok(Some(v.clone())),
        Some(_) => Err(ConvertError::invalid_field(path, field, "expected a number")),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object_keeps_field_order() {
        let node = SchemaNode::parse(&json!({
            "type": "object",
            "shape": {
                "zeta": { "type": "string" },
                "alpha": { "type": "number", "optional": true }
            }
        }))
        .unwrap();

        match node.kind {
            NodeKind::Object { shape, passthrough } => {
                assert!(!passthrough);
                let names: Vec<_> = shape.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["zeta", "alpha"]);
                assert!(shape[1].1.optional);
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_shorthand() {
        let node = SchemaNode::parse(&json!({ "type": "number", "int": true })).unwrap();
        assert!(matches!(node.kind, NodeKind::Number { integer: true, .. }));
    }

    #[test]
    fn test_missing_type_reports_path() {
        let err = SchemaNode::parse(&json!({
            "type": "object",
            "shape": { "name": { "optional": true } }
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ConvertError::MissingType {
                path: "$.shape.name".to_string()
            }
        );
    }

    #[test]
    fn test_non_mapping_is_not_a_schema() {
        let err = SchemaNode::parse(&json!("string")).unwrap_err();
        assert!(matches!(err, ConvertError::NotASchema { found: "string", .. }));
    }

    #[test]
    fn test_union_option_errors_are_indexed() {
        let err = SchemaNode::parse(&json!({
            "type": "union",
            "options": [{ "type": "string" }, { "type": "date" }]
        }))
        .unwrap_err();
        assert_eq!(err.path(), "$.options[1]");
    }

    #[test]
    fn test_bad_bound_type() {
        let err = SchemaNode::parse(&json!({ "type": "string", "minLength": -1 })).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidField { ref field, .. } if field == "minLength"));
    }
}
