//! MCP tool request types.
//!
//! These structs define the parameters for each MCP tool exposed by the server.
//! They only shape the JSON schema advertised to clients; values are forwarded
//! to the dispatcher, which validates them against the tool registry.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct EmptyParams {}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct FunctionRequest {
    #[schemars(
        description = "Function name (exact match). Defaults to the function at the current cursor position."
    )]
    pub function_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GlobalVariableRequest {
    #[schemars(description = "Global variable name (exact match)")]
    #[serde(alias = "symbol_name", alias = "name")]
    pub variable_name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ListFunctionsRequest {
    #[schemars(description = "Offset for pagination (default: 0)")]
    pub offset: Option<u64>,
    #[schemars(description = "Maximum functions to return (1-10000, default: 100)")]
    #[serde(alias = "count")]
    pub limit: Option<u64>,
    #[schemars(description = "Optional filter - only return functions whose name contains this text")]
    #[serde(alias = "query")]
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RenameFunctionRequest {
    #[schemars(description = "Function to rename (exact match). Defaults to the current function.")]
    pub function_name: Option<String>,
    #[schemars(description = "New function name (non-empty)")]
    pub new_name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RenameCurrentFunctionRequest {
    #[schemars(description = "New function name (non-empty)")]
    pub new_name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RenameVariableRequest {
    #[schemars(description = "Function containing the variable. Defaults to the current function.")]
    pub function_name: Option<String>,
    #[schemars(description = "Local variable name (exact match)")]
    pub variable_name: String,
    #[schemars(description = "New variable name (non-empty)")]
    pub new_name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetVariableTypeRequest {
    #[schemars(description = "Function containing the variable. Defaults to the current function.")]
    pub function_name: Option<String>,
    #[schemars(description = "Local variable name (exact match)")]
    pub variable_name: String,
    #[schemars(description = "Type declaration, e.g. 'uint32_t' or 'char*'")]
    pub new_type: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct AddCommentRequest {
    #[schemars(description = "Function the address belongs to. Defaults to the current function.")]
    pub function_name: Option<String>,
    #[schemars(description = "Address inside the function (hex string like '0x401000' or integer)")]
    #[serde(alias = "ea", alias = "addr")]
    pub address: Value,
    #[schemars(description = "Comment text; replaces any existing comment, empty text clears it")]
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_are_accepted() {
        let req: GlobalVariableRequest =
            serde_json::from_value(json!({"symbol_name": "g_table"})).expect("alias");
        assert_eq!(req.variable_name, "g_table");

        let req: AddCommentRequest =
            serde_json::from_value(json!({"ea": 4096, "comment": "entry"})).expect("alias");
        assert_eq!(req.address, json!(4096));
        assert!(req.function_name.is_none());
    }

    #[test]
    fn serializes_canonical_names() {
        let req: ListFunctionsRequest =
            serde_json::from_value(json!({"count": 5, "query": "init"})).expect("aliases");
        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(value["limit"], 5);
        assert_eq!(value["filter"], "init");
    }
}
