//! Schema description to JSON Schema conversion.
//!
//! [`convert`] is a pure function: the same description always yields the same
//! document, with properties in declaration order.

mod emit;
mod error;
mod node;

pub use emit::{to_json_schema, DRAFT_07};
pub use error::{ConvertError, Result};
pub use node::{NodeKind, NumberChecks, SchemaNode, StringChecks};

use serde_json::Value;

/// Convert a schema description into a draft-07 JSON Schema document.
pub fn convert(description: &Value) -> Result<Value> {
    let node = SchemaNode::parse(description)?;

    let mut document = match to_json_schema(&node) {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    document.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));

    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_person() {
        let description = json!({
            "type": "object",
            "shape": {
                "name": { "type": "string" },
                "age": { "type": "number" },
                "email": { "type": "string", "format": "email", "optional": true }
            }
        });

        let document = convert(&description).unwrap();
        assert_eq!(
            document,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "age": { "type": "number" },
                    "email": { "type": "string", "format": "email" }
                },
                "required": ["name", "age"],
                "additionalProperties": false,
                "$schema": "http://json-schema.org/draft-07/schema#"
            })
        );
    }

    #[test]
    fn test_schema_keyword_is_last() {
        let document = convert(&json!({ "type": "string" })).unwrap();
        let keys: Vec<_> = document.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["type", "$schema"]);
    }

    #[test]
    fn test_nested_array_of_union() {
        let document = convert(&json!({
            "type": "array",
            "element": {
                "type": "union",
                "options": [{ "type": "string" }, { "type": "number", "int": true }]
            },
            "minItems": 1
        }))
        .unwrap();

        assert_eq!(
            document["items"],
            json!({ "anyOf": [{ "type": "string" }, { "type": "integer" }] })
        );
        assert_eq!(document["minItems"], json!(1));
    }

    #[test]
    fn test_record() {
        let document = convert(&json!({ "type": "record", "values": { "type": "boolean" } })).unwrap();
        assert_eq!(document["additionalProperties"], json!({ "type": "boolean" }));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let err = convert(&json!({ "type": "bigint" })).unwrap_err();
        assert_eq!(err.to_string(), "$: unknown schema type \"bigint\"");
    }
}
