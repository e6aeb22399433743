//! Tool schema translation between the two function-call dialects.
//!
//! Dialect A is the shape MCP servers advertise (an `input_schema` object
//! nested under `function`); dialect B is the Chat Completions `tools` entry
//! (a `parameters` object). The translator is a pure function: same input,
//! same output, no side effects.

use serde::{Deserialize, Serialize};

/// One dialect-B tool entry, ready for a Chat Completions `tools` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ChatFunction,
}

/// The function payload of a dialect-B tool entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatFunction {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// JSON Schema fragment accepted by dialect B.
///
/// Only `type`, `properties`, and `required` survive translation. Any other
/// sibling fields of the source `input_schema` are discarded: dialect B has
/// no equivalent and unrecognized extensions must not leak through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub required: Vec<String>,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            kind: "object".into(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Translate a sequence of dialect-A entries into dialect B.
///
/// Entries missing the `type` marker, the `function` object, or a
/// `function.name`/`function.description` are silently dropped: a malformed
/// catalog entry is "not a tool" and must not abort the connect sequence.
pub fn translate(entries: &[serde_json::Value]) -> Vec<ChatTool> {
    entries.iter().filter_map(translate_entry).collect()
}

fn translate_entry(entry: &serde_json::Value) -> Option<ChatTool> {
    let object = entry.as_object()?;
    let kind = object.get("type")?.as_str()?;
    let function = object.get("function")?.as_object()?;
    let name = function.get("name")?.as_str()?;
    let description = function.get("description")?.as_str()?;

    let parameters = match function.get("input_schema").and_then(|s| s.as_object()) {
        Some(schema) => ToolParameters {
            kind: schema
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("object")
                .to_string(),
            properties: schema
                .get("properties")
                .and_then(|p| p.as_object())
                .cloned()
                .unwrap_or_default(),
            required: schema
                .get("required")
                .and_then(|r| r.as_array())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        },
        None => ToolParameters::default(),
    };

    Some(ChatTool {
        kind: kind.to_string(),
        function: ChatFunction {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dialect_a(name: &str, input_schema: Option<serde_json::Value>) -> serde_json::Value {
        let mut function = json!({
            "name": name,
            "description": format!("{name} tool"),
        });
        if let Some(schema) = input_schema {
            function["input_schema"] = schema;
        }
        json!({ "type": "function", "function": function })
    }

    #[test]
    fn translates_full_input_schema() {
        let entries = vec![dialect_a(
            "query_weather",
            Some(json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"],
            })),
        )];

        let tools = translate(&entries);
        assert_eq!(tools.len(), 1);
        let function = &tools[0].function;
        assert_eq!(function.name, "query_weather");
        assert_eq!(function.parameters.kind, "object");
        assert_eq!(function.parameters.required, vec!["city".to_string()]);
        assert!(function.parameters.properties.contains_key("city"));
    }

    #[test]
    fn defaults_apply_when_schema_fields_are_absent() {
        // An input_schema with none of type/properties/required still yields
        // a complete parameters object.
        let entries = vec![dialect_a("sql_inter", Some(json!({ "title": "ignored" })))];

        let tools = translate(&entries);
        assert_eq!(tools[0].function.parameters, ToolParameters::default());
    }

    #[test]
    fn missing_input_schema_yields_empty_parameters() {
        let tools = translate(&[dialect_a("noop", None)]);
        assert_eq!(tools[0].function.parameters, ToolParameters::default());
    }

    #[test]
    fn unrecognized_schema_siblings_are_discarded() {
        let entries = vec![dialect_a(
            "query_weather",
            Some(json!({
                "type": "object",
                "properties": {},
                "required": [],
                "additionalProperties": false,
                "$schema": "http://json-schema.org/draft-07/schema#",
            })),
        )];

        let serialized = serde_json::to_value(&translate(&entries)[0]).unwrap();
        let parameters = serialized["function"]["parameters"].as_object().unwrap();
        assert_eq!(parameters.len(), 3);
        assert!(parameters.contains_key("type"));
        assert!(parameters.contains_key("properties"));
        assert!(parameters.contains_key("required"));
    }

    #[test]
    fn malformed_entries_are_dropped_not_errors() {
        let entries = vec![
            json!({ "function": { "name": "no_type", "description": "d" } }),
            json!({ "type": "function" }),
            json!({ "type": "function", "function": { "description": "missing name" } }),
            json!({ "type": "function", "function": { "name": "missing_description" } }),
            json!("not an object"),
            dialect_a("survivor", None),
        ];

        let tools = translate(&entries);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "survivor");
    }

    #[test]
    fn translation_is_deterministic() {
        let entries = vec![
            dialect_a("a", Some(json!({ "type": "object" }))),
            dialect_a("b", None),
        ];
        assert_eq!(translate(&entries), translate(&entries));
    }

    #[test]
    fn output_order_follows_input_order() {
        let entries = vec![
            dialect_a("zeta", None),
            dialect_a("alpha", None),
            dialect_a("mid", None),
        ];
        let names: Vec<_> = translate(&entries)
            .into_iter()
            .map(|t| t.function.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
