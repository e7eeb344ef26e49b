//! Tool catalogue rendered into the system prompt.
//!
//! Every tool is advertised two ways: a fenced block tagged with its id whose
//! body is the argument, and a ` ```tool_call ` block carrying a JSON
//! [`ToolCall`](crate::ToolCall).

use serde_json::{Map, Value};

/// Fence tag of the structured call form.
pub const TOOL_CALL_TAG: &str = "tool_call";

#[derive(Debug, Clone)]
pub struct ToolDef {
    /// Also the tag of the tool's fenced block.
    pub id: &'static str,
    pub description: &'static str,
    pub schema: schemars::Schema,
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    #[must_use]
    pub fn from_definitions(tools: Vec<ToolDef>) -> Self {
        Self { tools }
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    /// Render every tool inside a `<tools>` block.
    #[must_use]
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::from("<tools>\n");
        for tool in &self.tools {
            render_tool(&mut out, tool);
        }
        out.push_str("</tools>");
        out
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Param<'a> {
    name: &'a str,
    ty: &'a str,
    description: &'a str,
    required: bool,
}

fn render_tool(out: &mut String, tool: &ToolDef) {
    let id = tool.id;
    out.push_str(&format!("## {id}\n{}\n", tool.description));
    out.push_str(&format!(
        "Call with a ```{id} block containing the argument, or a ```{TOOL_CALL_TAG} block \
         containing {{\"tool_id\": \"{id}\", \"params\": {{...}}}}\n"
    ));

    let params = schema_params(&tool.schema);
    if !params.is_empty() {
        out.push_str("Parameters:\n");
        for p in params {
            let need = if p.required { "required" } else { "optional" };
            out.push_str(&format!(
                "  - {}: {} ({}, {need})\n",
                p.name, p.description, p.ty
            ));
        }
    }
    out.push('\n');
}

fn schema_params(schema: &schemars::Schema) -> Vec<Param<'_>> {
    let Some(root) = schema.as_object() else {
        return Vec::new();
    };
    let Some(Value::Object(props)) = root.get("properties") else {
        return Vec::new();
    };
    let required: Vec<&str> = root
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    props
        .iter()
        .map(|(name, prop)| {
            let prop = prop.as_object();
            Param {
                name,
                ty: prop.and_then(primary_type).unwrap_or("string"),
                description: prop
                    .and_then(|o| o.get("description"))
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
                required: required.contains(&name.as_str()),
            }
        })
        .collect()
}

/// `Option<T>` renders as `"type": ["T", "null"]` or an `anyOf` with a null arm.
fn primary_type(prop: &Map<String, Value>) -> Option<&str> {
    match prop.get("type") {
        Some(Value::String(ty)) => return Some(ty.as_str()),
        Some(Value::Array(types)) => {
            return types.iter().filter_map(Value::as_str).find(|t| *t != "null");
        }
        _ => {}
    }
    prop.get("anyOf")?
        .as_array()?
        .iter()
        .filter_map(|arm| arm.get("type")?.as_str())
        .find(|t| *t != "null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::RetrieveParams;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    #[allow(dead_code)]
    struct PageParams {
        /// Source to page through
        source: String,
        /// Page number
        page: Option<u32>,
    }

    fn sample_tools() -> Vec<ToolDef> {
        vec![
            ToolDef {
                id: "retrieve",
                description: "Search indexed documents",
                schema: schemars::schema_for!(RetrieveParams),
            },
            ToolDef {
                id: "page",
                description: "Read one page of a source",
                schema: schemars::schema_for!(PageParams),
            },
        ]
    }

    #[test]
    fn empty_registry_renders_empty_block() {
        assert_eq!(
            ToolRegistry::default().format_for_prompt(),
            "<tools>\n</tools>"
        );
    }

    #[test]
    fn prompt_lists_each_tool_with_both_call_forms() {
        let reg = ToolRegistry::from_definitions(sample_tools());
        assert_eq!(reg.tools().len(), 2);

        let prompt = reg.format_for_prompt();
        assert!(prompt.starts_with("<tools>\n## retrieve\nSearch indexed documents\n"));
        assert!(prompt.ends_with("</tools>"));
        assert!(prompt.contains("Call with a ```retrieve block containing the argument"));
        assert!(prompt.contains("```tool_call block containing {\"tool_id\": \"retrieve\""));
        assert!(prompt.contains("## page"));
        assert!(prompt.contains("Call with a ```page block"));
        assert!(prompt.contains("{\"tool_id\": \"page\", \"params\": {...}}"));
    }

    #[test]
    fn params_carry_type_and_requiredness() {
        let prompt = ToolRegistry::from_definitions(sample_tools()).format_for_prompt();
        assert!(prompt.contains("  - query: Natural-language search query (string, required)"));
        assert!(prompt.contains("  - source: Source to page through (string, required)"));
        assert!(
            prompt.contains("  - page: Page number (integer, optional)"),
            "Option<u32> should render as integer: {prompt}"
        );
    }

    #[test]
    fn schema_without_properties_has_no_params() {
        let schema = schemars::json_schema!({"type": "object"});
        assert!(schema_params(&schema).is_empty());
    }
}
