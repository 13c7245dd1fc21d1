//! Binary analysis MCP bridge
//!
//! This library exposes a binary-analysis database (functions, disassembly,
//! decompiled code, globals, comments) to LLM agents over MCP (Model Context
//! Protocol).
//!
//! # Architecture
//!
//! - **AnalysisSource**: the query/mutation surface of the analysis engine.
//!   [`analysis::InMemorySource`] implements it over a JSON snapshot.
//!
//! - **SessionContext**: the function at the user's cursor, if any. Set only
//!   by cursor events; read by the resolver.
//!
//! - **SymbolResolver**: maps a name, or the current-function context, to a
//!   concrete target. Exact matches only; ambiguous names fail closed.
//!
//! - **Dispatcher**: validates arguments, resolves the target and runs the
//!   tool's handler. Mutations are serialized per target via
//!   [`locks::TargetLocks`].
//!
//! - **BinjaMcpServer**: the MCP server, built on `rmcp`. Each call runs the
//!   dispatcher on the blocking pool under a timeout.
//!
//! # Tools
//!
//! ## Functions
//! - `list_functions`: List functions (paginated, filterable)
//!
//! ## Disassembly / Decompile
//! - `get_function_assembly`, `get_current_function_assembly`
//! - `get_function_decompiled`, `get_current_function_decompiled`
//!
//! ## Globals / Metadata
//! - `get_global_variable`: Address, type and value of a global
//! - `get_binary_info`: Architecture, entry point, segments
//!
//! ## Editing
//! - `rename_function`, `rename_current_function`
//! - `rename_variable`, `set_variable_type`
//! - `add_comment`

use std::path::PathBuf;

pub mod analysis;
pub mod disasm;
pub mod dispatch;
pub mod error;
pub mod locks;
pub mod resolver;
pub mod server;
pub mod session;
pub mod tool_registry;
pub mod tools;

pub use analysis::{AnalysisSource, InMemorySource, Snapshot};
pub use dispatch::{Dispatcher, ToolRequest, ToolResult};
pub use error::{FailureKind, ToolError};
pub use server::BinjaMcpServer;
pub use session::SessionContext;
pub use tool_registry::{ToolCategory, ToolInfo, TOOL_REGISTRY};

/// Expand `~/` prefix to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    path.strip_prefix("~/")
        .and_then(|stripped| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(stripped)))
        .unwrap_or_else(|| PathBuf::from(path))
}
