//! Tool synthesis: names, descriptions and input schemas for discovered methods.
//!
//! Tool names are `<prefix>_<escaped method>`. The escape lower-cases ASCII
//! letters, keeps digits, doubles `_` and writes every other character as
//! `_<hex code point>_`. Because hex digits never include `_`, the escaped
//! form decodes unambiguously, so two methods differing in anything but
//! letter case always get distinct tool names.

use serde_json::{json, Map, Value};

use billbridge_core::ToolDefinition;
use billbridge_source::{MethodDetails, ParameterSpec};

/// Keyword hints appended to descriptions. First match wins.
///
/// Purely cosmetic: hints never influence naming or dispatch.
const DESCRIPTION_HINTS: &[(&str, &str)] = &[
    ("ticket", "Support ticket operation."),
    ("invoice", "Billing and invoicing operation."),
    ("transaction", "Payment transaction operation."),
    ("payment", "Payment transaction operation."),
    ("quote", "Sales quote operation."),
    ("order", "Order management operation."),
    ("client", "Client account operation."),
    ("contact", "Client contact operation."),
    ("domain", "Domain registration operation."),
    ("product", "Product catalog operation."),
    ("module", "Provisioning module operation."),
    ("email", "Email delivery operation."),
    ("announcement", "Announcement publishing operation."),
];

/// Derives tool definitions from discovered methods.
#[derive(Debug, Clone)]
pub struct ToolSynthesizer {
    prefix: String,
}

impl ToolSynthesizer {
    /// Create a synthesizer using `prefix` as the tool-name namespace.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The namespace token.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Tool name for a method.
    pub fn tool_name(&self, method: &str) -> String {
        format!("{}_{}", self.prefix, escape_method_name(method))
    }

    /// Full tool definition for a method and its (possibly generic) details.
    pub fn definition(&self, method: &str, details: &MethodDetails) -> ToolDefinition {
        ToolDefinition::new(self.tool_name(method), describe(method, details))
            .with_input_schema(input_schema(details))
    }
}

/// Escape a method name into the `[a-z0-9_]` alphabet.
pub fn escape_method_name(method: &str) -> String {
    let mut escaped = String::with_capacity(method.len());
    for c in method.chars() {
        match c {
            'a'..='z' | '0'..='9' => escaped.push(c),
            'A'..='Z' => escaped.push(c.to_ascii_lowercase()),
            '_' => escaped.push_str("__"),
            other => escaped.push_str(&format!("_{:x}_", other as u32)),
        }
    }
    escaped
}

/// Description for a method: the source's own text, or a generic one.
pub fn describe(method: &str, details: &MethodDetails) -> String {
    let base = match details.description() {
        Some(description) => description.to_string(),
        None => format!("Execute {} API call", method),
    };

    match category_hint(method) {
        Some(hint) if !base.contains(hint) => {
            let separator = if base.ends_with('.') { " " } else { ". " };
            format!("{}{}{}", base, separator, hint)
        }
        _ => base,
    }
}

/// Contextual hint for a method name, if one of the keywords matches.
pub fn category_hint(method: &str) -> Option<&'static str> {
    let lower = method.to_lowercase();
    DESCRIPTION_HINTS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, hint)| *hint)
}

/// Input schema for a method.
///
/// Without parameter metadata the schema is left open so arbitrary
/// arguments still reach the source.
pub fn input_schema(details: &MethodDetails) -> Value {
    if !details.has_parameters() {
        return json!({
            "type": "object",
            "properties": {},
            "additionalProperties": true
        });
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in &details.parameters {
        properties.insert(param.name.clone(), parameter_schema(param));
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

fn parameter_schema(param: &ParameterSpec) -> Value {
    let mut schema = json!({ "type": schema_type(&param.param_type) });
    let description = param
        .description
        .clone()
        .unwrap_or_else(|| param.name.clone());
    schema["description"] = Value::String(description);
    schema
}

/// Map a source type name onto a JSON Schema type.
fn schema_type(source_type: &str) -> &'static str {
    match source_type.trim().to_lowercase().as_str() {
        "int" | "integer" | "long" => "integer",
        "float" | "double" | "decimal" | "number" | "numeric" => "number",
        "bool" | "boolean" => "boolean",
        "array" | "list" => "array",
        "object" | "map" | "dict" => "object",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_name_plain_methods() {
        let synth = ToolSynthesizer::new("billing");
        assert_eq!(synth.tool_name("GetClients"), "billing_getclients");
        assert_eq!(synth.tool_name("foo"), "billing_foo");
        assert_eq!(synth.tool_name("AddOrder2"), "billing_addorder2");
    }

    #[test]
    fn test_escape_is_unambiguous() {
        assert_eq!(escape_method_name("get_clients"), "get__clients");
        assert_eq!(escape_method_name("get-clients"), "get_2d_clients");
        assert_eq!(escape_method_name("get.clients"), "get_2e_clients");
        assert_eq!(escape_method_name("a b"), "a_20_b");
    }

    #[test]
    fn test_names_injective_over_separators() {
        let methods = [
            "get_clients",
            "get-clients",
            "get.clients",
            "get__clients",
            "get_2d_clients",
            "getclients",
            "get clients",
            "get/clients",
        ];
        let names: HashSet<String> = methods.iter().map(|m| escape_method_name(m)).collect();
        assert_eq!(names.len(), methods.len());
    }

    #[test]
    fn test_names_deterministic() {
        let synth = ToolSynthesizer::new("billing");
        assert_eq!(synth.tool_name("Update.Client"), synth.tool_name("Update.Client"));
    }

    #[test]
    fn test_generic_description_and_open_schema() {
        let synth = ToolSynthesizer::new("billing");
        let def = synth.definition("foo", &MethodDetails::generic());
        assert_eq!(def.name, "billing_foo");
        assert_eq!(def.description, "Execute foo API call");
        assert_eq!(def.input_schema["additionalProperties"], true);
        assert!(def.is_open());
    }

    #[test]
    fn test_fetched_description_used_verbatim() {
        let details = MethodDetails {
            description: Some("Obtain the list of currencies".to_string()),
            parameters: vec![],
        };
        assert_eq!(describe("GetCurrencies", &details), "Obtain the list of currencies");
    }

    #[test]
    fn test_hint_appended() {
        assert_eq!(
            describe("GetTickets", &MethodDetails::generic()),
            "Execute GetTickets API call. Support ticket operation."
        );

        let details = MethodDetails {
            description: Some("Opens a new ticket.".to_string()),
            parameters: vec![],
        };
        assert_eq!(
            describe("OpenTicket", &details),
            "Opens a new ticket. Support ticket operation."
        );
        assert_eq!(category_hint("GetCurrencies"), None);
    }

    #[test]
    fn test_schema_from_parameters() {
        let details = MethodDetails {
            description: None,
            parameters: vec![
                ParameterSpec::new("clientid")
                    .with_type("int")
                    .with_description("The client to obtain")
                    .required(),
                ParameterSpec::new("stats").with_type("bool"),
                ParameterSpec::new("email"),
            ],
        };

        let schema = input_schema(&details);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["clientid"]["type"], "integer");
        assert_eq!(schema["properties"]["clientid"]["description"], "The client to obtain");
        assert_eq!(schema["properties"]["stats"]["type"], "boolean");
        assert_eq!(schema["properties"]["email"]["type"], "string");
        assert_eq!(schema["required"], json!(["clientid"]));
        assert!(schema.get("additionalProperties").is_none());
    }

    #[test]
    fn test_schema_without_required() {
        let details = MethodDetails {
            description: None,
            parameters: vec![ParameterSpec::new("limitnum").with_type("integer")],
        };
        let schema = input_schema(&details);
        assert!(schema.get("required").is_none());
        assert_eq!(schema["properties"]["limitnum"]["description"], "limitnum");
    }
}
