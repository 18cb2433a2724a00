//! Meta-mode tools.
//!
//! For large APIs the surface is bounded to three indirection tools that
//! browse, describe and call the discovered methods. All three share one
//! snapshot of the discovered set taken when the surface was built; only
//! names in that snapshot are callable.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use billbridge_core::ToolDefinition;
use billbridge_source::Discovery;

use crate::registry::{optional_str, required_str, Tool};
use crate::synth::{describe, input_schema};
use crate::ToolError;

/// Name of the method browsing tool.
pub const LIST_METHODS: &str = "list_methods";
/// Name of the method description tool.
pub const GET_METHOD_DETAILS: &str = "get_method_details";
/// Name of the generic invocation tool.
pub const CALL_API: &str = "call_api";

/// Built-in category keywords. Categories overlap; a method may match several.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("clients", &["client", "contact", "user"]),
    ("orders", &["order", "invoice", "payment"]),
    (
        "billing",
        &["invoice", "transaction", "payment", "credit", "quote", "billable"],
    ),
    ("support", &["ticket", "support", "announcement"]),
    ("domains", &["domain", "tld", "whois", "registrar"]),
    ("products", &["product", "service", "addon", "module"]),
    (
        "system",
        &["admin", "config", "activity", "health", "email", "stats", "system"],
    ),
];

/// Discovered method names shared by the meta tools.
pub type MethodSet = Arc<Vec<String>>;

/// Whether `method` belongs to `category`.
///
/// Known categories match any of their keywords; anything else is matched as
/// a plain substring. Both comparisons ignore case.
pub fn matches_category(method: &str, category: &str) -> bool {
    let method = method.to_lowercase();
    let category = category.trim().to_lowercase();
    match CATEGORIES.iter().find(|(name, _)| *name == category) {
        Some((_, keywords)) => keywords.iter().any(|k| method.contains(k)),
        None => method.contains(&category),
    }
}

fn ensure_discovered<'a>(methods: &MethodSet, method: &'a str) -> Result<&'a str, ToolError> {
    if methods.iter().any(|m| m == method) {
        Ok(method)
    } else {
        warn!(method, "Rejected method outside the discovered set");
        Err(ToolError::NotPermitted(method.to_string()))
    }
}

/// Browse discovered methods by substring and category.
pub struct ListMethodsTool {
    methods: MethodSet,
}

impl ListMethodsTool {
    /// Create over a discovered set.
    pub fn new(methods: MethodSet) -> Self {
        Self { methods }
    }
}

#[async_trait]
impl Tool for ListMethodsTool {
    fn name(&self) -> &str {
        LIST_METHODS
    }

    fn definition(&self) -> ToolDefinition {
        let categories: Vec<&str> = CATEGORIES.iter().map(|(name, _)| *name).collect();
        ToolDefinition::new(
            LIST_METHODS,
            "List the available API methods. Filter by a case-insensitive substring \
             of the method name and/or by category.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "string",
                    "description": "Only return methods whose name contains this text"
                },
                "category": {
                    "type": "string",
                    "description": format!(
                        "Only return methods in this category ({}), or whose name contains it",
                        categories.join(", ")
                    )
                }
            }
        }))
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let filter = optional_str(&arguments, "filter")?
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
        let category = optional_str(&arguments, "category")?
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let matched: Vec<&String> = self
            .methods
            .iter()
            .filter(|m| match filter {
                Some(ref f) => m.to_lowercase().contains(f.as_str()),
                None => true,
            })
            .filter(|m| category.map_or(true, |c| matches_category(m, c)))
            .collect();

        debug!(
            filter = ?filter,
            category = ?category,
            matched = matched.len(),
            "Listed methods"
        );

        let mut result = json!({
            "total": self.methods.len(),
            "filtered": matched.len(),
            "methods": matched,
        });
        if category.is_none() {
            let categories: Vec<&str> = CATEGORIES.iter().map(|(name, _)| *name).collect();
            result["categories"] = json!(categories);
        }
        Ok(result)
    }
}

/// Describe one discovered method.
pub struct MethodDetailsTool {
    methods: MethodSet,
    discovery: Arc<Discovery>,
}

impl MethodDetailsTool {
    /// Create over a discovered set.
    pub fn new(methods: MethodSet, discovery: Arc<Discovery>) -> Self {
        Self { methods, discovery }
    }
}

#[async_trait]
impl Tool for MethodDetailsTool {
    fn name(&self) -> &str {
        GET_METHOD_DETAILS
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            GET_METHOD_DETAILS,
            "Get the description and parameters of one API method.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "method": {
                    "type": "string",
                    "description": "Exact method name, as returned by list_methods"
                }
            },
            "required": ["method"]
        }))
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let method = ensure_discovered(&self.methods, required_str(&arguments, "method")?)?;
        let details = self.discovery.details_or_generic(method).await;

        Ok(json!({
            "method": method,
            "description": describe(method, &details),
            "parameters": details.parameters,
            "inputSchema": input_schema(&details),
        }))
    }
}

/// Invoke any discovered method by name.
pub struct CallApiTool {
    methods: MethodSet,
    discovery: Arc<Discovery>,
}

impl CallApiTool {
    /// Create over a discovered set.
    pub fn new(methods: MethodSet, discovery: Arc<Discovery>) -> Self {
        Self { methods, discovery }
    }
}

#[async_trait]
impl Tool for CallApiTool {
    fn name(&self) -> &str {
        CALL_API
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            CALL_API,
            "Call an API method by name. Only methods returned by list_methods \
             can be called.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "method": {
                    "type": "string",
                    "description": "Exact method name, as returned by list_methods"
                },
                "parameters": {
                    "type": "object",
                    "description": "Parameters passed to the method",
                    "additionalProperties": true
                }
            },
            "required": ["method"]
        }))
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let method = ensure_discovered(&self.methods, required_str(&arguments, "method")?)?;
        let parameters = match arguments.get("parameters") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(Value::Object(p)) => Value::Object(p.clone()),
            Some(_) => return Err(ToolError::invalid_args("'parameters' must be an object")),
        };

        debug!(method, "Invoking method via call_api");
        Ok(self.discovery.invoke(method, parameters).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbridge_source::{CatalogMethod, CatalogSource, ParameterSpec};
    use std::time::Duration;

    fn setup(source: CatalogSource) -> (Arc<CatalogSource>, Arc<Discovery>) {
        let source = Arc::new(source);
        let discovery = Arc::new(Discovery::new(source.clone(), Duration::from_secs(300)));
        (source, discovery)
    }

    fn names(result: &Value) -> Vec<String> {
        serde_json::from_value(result["methods"].clone()).unwrap()
    }

    #[test]
    fn test_category_matching() {
        assert!(matches_category("GetOrders", "orders"));
        assert!(matches_category("GetInvoices", "ORDERS"));
        assert!(!matches_category("AddPayMethod", "orders"));
        assert!(matches_category("GetTLDPricing", "domains"));
        // Unknown categories fall back to substring matching
        assert!(matches_category("GetCurrencies", "currenc"));
        assert!(!matches_category("GetClients", "currenc"));
    }

    #[tokio::test]
    async fn test_list_methods_filter_and_category() {
        let methods: MethodSet = Arc::new(
            ["GetOrders", "AddOrder", "GetClients", "GetInvoices", "OpenTicket"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let tool = ListMethodsTool::new(methods);

        let all = tool.execute(json!({})).await.unwrap();
        assert_eq!(all["total"], 5);
        assert_eq!(all["filtered"], 5);
        assert!(all["categories"].is_array());

        let orders = tool.execute(json!({"filter": "ORDER"})).await.unwrap();
        assert_eq!(names(&orders), vec!["GetOrders", "AddOrder"]);
        assert_eq!(orders["total"], 5);
        assert_eq!(orders["filtered"], 2);

        let billing = tool.execute(json!({"category": "orders"})).await.unwrap();
        assert_eq!(names(&billing), vec!["GetOrders", "AddOrder", "GetInvoices"]);
        assert!(billing.get("categories").is_none());

        let both = tool
            .execute(json!({"category": "orders", "filter": "get"}))
            .await
            .unwrap();
        assert_eq!(names(&both), vec!["GetOrders", "GetInvoices"]);
    }

    #[tokio::test]
    async fn test_call_api_rejects_undiscovered_method() {
        let (source, discovery) = setup(CatalogSource::with_methods(["GetClients", "DeleteClient"]));
        let methods: MethodSet = Arc::new(vec!["GetClients".to_string()]);
        let tool = CallApiTool::new(methods, discovery);

        let err = tool
            .execute(json!({"method": "DeleteClient", "parameters": {"clientid": 1}}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotPermitted(ref m) if m == "DeleteClient"));
        assert!(err.to_string().contains("not available or not permitted"));
        assert!(source.invocations().is_empty());

        let ok = tool
            .execute(json!({"method": "GetClients", "parameters": {"limitnum": 2}}))
            .await
            .unwrap();
        assert_eq!(ok["arguments"]["limitnum"], 2);

        let no_params = tool.execute(json!({"method": "GetClients"})).await.unwrap();
        assert_eq!(no_params["arguments"], json!({}));
    }

    #[tokio::test]
    async fn test_call_api_argument_errors() {
        let (_, discovery) = setup(CatalogSource::with_methods(["GetClients"]));
        let tool = CallApiTool::new(Arc::new(vec!["GetClients".to_string()]), discovery);

        let missing = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(missing, ToolError::MissingParameter(ref p) if p == "method"));

        let bad = tool
            .execute(json!({"method": "GetClients", "parameters": [1, 2]}))
            .await
            .unwrap_err();
        assert!(matches!(bad, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_method_details() {
        let (_, discovery) = setup(
            CatalogSource::new()
                .with_method(
                    CatalogMethod::new("GetOrders")
                        .with_description("Obtain orders matching the passed criteria")
                        .with_parameter(ParameterSpec::new("id").with_type("int")),
                )
                .with_method(CatalogMethod::new("foo"))
                .failing_details("foo"),
        );
        let methods: MethodSet = Arc::new(vec!["GetOrders".to_string(), "foo".to_string()]);
        let tool = MethodDetailsTool::new(methods, discovery);

        let details = tool.execute(json!({"method": "GetOrders"})).await.unwrap();
        assert_eq!(details["method"], "GetOrders");
        assert!(details["description"]
            .as_str()
            .unwrap()
            .starts_with("Obtain orders matching the passed criteria"));
        assert_eq!(details["inputSchema"]["properties"]["id"]["type"], "integer");

        let generic = tool.execute(json!({"method": "foo"})).await.unwrap();
        assert_eq!(generic["description"], "Execute foo API call");
        assert_eq!(generic["inputSchema"]["additionalProperties"], true);

        let missing = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(missing, ToolError::MissingParameter(_)));

        let unknown = tool.execute(json!({"method": "Nope"})).await.unwrap_err();
        assert!(matches!(unknown, ToolError::NotPermitted(_)));
    }
}
