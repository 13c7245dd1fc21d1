//! Static tool registry.
//!
//! Maps each tool name to its handler and documentation. The set of tools is
//! fixed at build time; dispatch looks tools up here by exact name.

use crate::tools::edit::{AddComment, RenameFunction, RenameVariable, SetVariableType};
use crate::tools::read::{
    GetBinaryInfo, GetFunctionAssembly, GetFunctionDecompiled, GetGlobalVariable, ListFunctions,
};
use crate::tools::ToolHandler;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tool category for grouping related tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Function navigation and discovery
    Functions,
    /// Disassembly tools
    Disassembly,
    /// Decompilation tools
    Decompile,
    /// Global data symbols
    Globals,
    /// Binary-level metadata
    Metadata,
    /// Renaming, retyping and comment editing
    Editing,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functions => "functions",
            Self::Disassembly => "disassembly",
            Self::Decompile => "decompile",
            Self::Globals => "globals",
            Self::Metadata => "metadata",
            Self::Editing => "editing",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Functions => "List and filter functions",
            Self::Disassembly => "Disassemble whole functions",
            Self::Decompile => "Decompiled high-level representation of functions",
            Self::Globals => "Look up global data symbols",
            Self::Metadata => "Binary architecture, entry point and segments",
            Self::Editing => "Rename functions and variables, set types, add comments",
        }
    }

    pub fn all() -> &'static [ToolCategory] {
        &[
            Self::Functions,
            Self::Disassembly,
            Self::Decompile,
            Self::Globals,
            Self::Metadata,
            Self::Editing,
        ]
    }
}

impl FromStr for ToolCategory {
    type Err = ();

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "functions" | "function" => Ok(Self::Functions),
            "disassembly" | "disasm" | "assembly" => Ok(Self::Disassembly),
            "decompile" | "decompiler" | "hlil" => Ok(Self::Decompile),
            "globals" | "global" | "data" => Ok(Self::Globals),
            "metadata" | "meta" | "info" => Ok(Self::Metadata),
            "editing" | "edit" => Ok(Self::Editing),
            _ => Err(()),
        }
    }
}

/// Metadata and handler for a single tool
#[derive(Clone, Copy)]
pub struct ToolInfo {
    pub name: &'static str,
    pub category: ToolCategory,
    /// Short description (1 line, <100 chars)
    pub short_desc: &'static str,
    /// Full description with usage details
    pub full_desc: &'static str,
    /// Example invocation (JSON)
    pub example: &'static str,
    pub keywords: &'static [&'static str],
    pub handler: &'static dyn ToolHandler,
}

impl std::fmt::Debug for ToolInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInfo")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Static registry of all tools
pub static TOOL_REGISTRY: &[ToolInfo] = &[
    // === FUNCTIONS ===
    ToolInfo {
        name: "list_functions",
        category: ToolCategory::Functions,
        short_desc: "List functions with pagination and name filter",
        full_desc: "List functions in address order. Use offset/limit to page through large \
                    binaries (limit 1-10000, default 100) and filter for a case-insensitive \
                    substring match on the name. Returns total and next_offset for paging.",
        example: r#"{"offset": 0, "limit": 50, "filter": "parse"}"#,
        keywords: &["list", "functions", "enumerate", "filter", "names"],
        handler: &ListFunctions,
    },
    // === DISASSEMBLY ===
    ToolInfo {
        name: "get_function_assembly",
        category: ToolCategory::Disassembly,
        short_desc: "Disassemble a function by name",
        full_desc: "Return the disassembly of a function, one instruction per line \
                    ('address:<TAB>instruction') in ascending address order. The name must \
                    match exactly; when it is omitted the function at the current cursor \
                    position is used. Fails with ambiguous when several functions share the name.",
        example: r#"{"function_name": "main"}"#,
        keywords: &["disasm", "assembly", "instructions", "function", "listing"],
        handler: &GetFunctionAssembly {
            current_only: false,
        },
    },
    ToolInfo {
        name: "get_current_function_assembly",
        category: ToolCategory::Disassembly,
        short_desc: "Disassemble the function at the cursor",
        full_desc: "Return the disassembly of the function containing the current cursor \
                    position. Fails with no_current_context when the cursor is outside any function.",
        example: r#"{}"#,
        keywords: &["disasm", "assembly", "current", "cursor", "here"],
        handler: &GetFunctionAssembly { current_only: true },
    },
    // === DECOMPILE ===
    ToolInfo {
        name: "get_function_decompiled",
        category: ToolCategory::Decompile,
        short_desc: "Decompile a function by name",
        full_desc: "Return the decompiled high-level representation of a function, verbatim \
                    as the engine renders it. The name must match exactly; when it is omitted \
                    the function at the current cursor position is used.",
        example: r#"{"function_name": "main"}"#,
        keywords: &["decompile", "pseudocode", "hlil", "source", "function"],
        handler: &GetFunctionDecompiled {
            current_only: false,
        },
    },
    ToolInfo {
        name: "get_current_function_decompiled",
        category: ToolCategory::Decompile,
        short_desc: "Decompile the function at the cursor",
        full_desc: "Return the decompiled representation of the function containing the \
                    current cursor position.",
        example: r#"{}"#,
        keywords: &["decompile", "pseudocode", "current", "cursor", "here"],
        handler: &GetFunctionDecompiled { current_only: true },
    },
    // === GLOBALS ===
    ToolInfo {
        name: "get_global_variable",
        category: ToolCategory::Globals,
        short_desc: "Look up a global variable by name",
        full_desc: "Return the address, type and statically known value of a global data \
                    symbol. Type is 'unknown' and value is null when the engine has none. \
                    Accepts symbol_name or name as aliases for variable_name.",
        example: r#"{"variable_name": "g_config"}"#,
        keywords: &["global", "variable", "data", "symbol", "value", "type"],
        handler: &GetGlobalVariable,
    },
    // === METADATA ===
    ToolInfo {
        name: "get_binary_info",
        category: ToolCategory::Metadata,
        short_desc: "Binary architecture, entry point and segments",
        full_desc: "Return binary-level metadata: filename, architecture, platform, entry \
                    point, address span, address size, endianness, function count and \
                    segments with rwx permissions.",
        example: r#"{}"#,
        keywords: &["info", "metadata", "arch", "entry", "segments", "binary"],
        handler: &GetBinaryInfo,
    },
    // === EDITING ===
    ToolInfo {
        name: "rename_function",
        category: ToolCategory::Editing,
        short_desc: "Rename a function",
        full_desc: "Rename a function. function_name selects it by exact name (defaults to \
                    the current function); new_name must be non-empty. The engine may reject \
                    the change, e.g. when another function already has the name.",
        example: r#"{"function_name": "sub_401000", "new_name": "parse_header"}"#,
        keywords: &["rename", "name", "function", "label", "symbol"],
        handler: &RenameFunction {
            current_only: false,
        },
    },
    ToolInfo {
        name: "rename_current_function",
        category: ToolCategory::Editing,
        short_desc: "Rename the function at the cursor",
        full_desc: "Rename the function containing the current cursor position.",
        example: r#"{"new_name": "parse_header"}"#,
        keywords: &["rename", "current", "cursor", "function"],
        handler: &RenameFunction { current_only: true },
    },
    ToolInfo {
        name: "rename_variable",
        category: ToolCategory::Editing,
        short_desc: "Rename a local variable",
        full_desc: "Rename a local variable of a function. function_name selects the \
                    function (defaults to the current one); variable_name must match exactly. \
                    The engine rejects names already used by another variable of the function.",
        example: r#"{"function_name": "main", "variable_name": "var_8", "new_name": "count"}"#,
        keywords: &["rename", "variable", "local", "stack", "argument"],
        handler: &RenameVariable,
    },
    ToolInfo {
        name: "set_variable_type",
        category: ToolCategory::Editing,
        short_desc: "Change the type of a local variable",
        full_desc: "Set the type of a local variable. new_type is passed to the engine's type \
                    parser as-is; the engine may reject it.",
        example: r#"{"function_name": "main", "variable_name": "count", "new_type": "size_t"}"#,
        keywords: &["type", "retype", "variable", "declare"],
        handler: &SetVariableType,
    },
    ToolInfo {
        name: "add_comment",
        category: ToolCategory::Editing,
        short_desc: "Set a comment at an address inside a function",
        full_desc: "Set the comment at an address. The address must lie inside the selected \
                    function (defaults to the current function). Any existing comment at the \
                    address is replaced; an empty comment clears it. Accepts ea or addr as \
                    aliases for address.",
        example: r#"{"function_name": "main", "address": "0x401010", "comment": "checks magic"}"#,
        keywords: &["comment", "annotate", "note", "address"],
        handler: &AddComment,
    },
];

/// Get all tools
pub fn all_tools() -> impl Iterator<Item = &'static ToolInfo> {
    TOOL_REGISTRY.iter()
}

/// Get tool by name
pub fn get_tool(name: &str) -> Option<&'static ToolInfo> {
    TOOL_REGISTRY.iter().find(|t| t.name == name)
}

/// Get tools by category
pub fn tools_by_category(category: ToolCategory) -> impl Iterator<Item = &'static ToolInfo> {
    TOOL_REGISTRY.iter().filter(move |t| t.category == category)
}
