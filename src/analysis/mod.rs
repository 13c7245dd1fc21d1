//! Analysis data source abstraction.
//!
//! The disassembler/decompiler engine owns the analysis database. This module
//! defines the narrow query and mutation surface the bridge needs from it, plus
//! an in-memory implementation backed by an exported JSON snapshot.
//!
//! All calls are synchronous and bounded. Implementations must be safe to call
//! from several threads at once for reads; the bridge serializes mutations per
//! target on its own (see [`crate::locks`]).

mod memory;
mod snapshot;
pub mod types;

pub use memory::InMemorySource;
pub use snapshot::{
    CommentEntry, FunctionEntry, GlobalEntry, Snapshot, SnapshotError, VariableEntry,
};
pub use types::*;

use thiserror::Error;

/// Failures reported by the analysis data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The handle no longer refers to a live object.
    #[error("{0} no longer exists in the analysis database")]
    Stale(String),

    /// The engine refused a mutation (duplicate or reserved name, bad type, ...).
    #[error("{0}")]
    Rejected(String),

    /// The requested representation could not be produced.
    #[error("{0}")]
    Unavailable(String),
}

/// Query and mutation surface of the analysis database.
pub trait AnalysisSource: Send + Sync {
    /// Every function whose name matches `name` exactly.
    fn functions_named(&self, name: &str) -> Vec<FunctionRecord>;

    fn function(&self, handle: FunctionHandle) -> Option<FunctionRecord>;

    /// The function whose ranges contain `address`, if any.
    fn function_containing(&self, address: u64) -> Option<FunctionRecord>;

    /// All functions, ordered by start address.
    fn functions(&self) -> Vec<FunctionRecord>;

    /// Every local variable of `function` whose name matches `name` exactly.
    fn variables_named(&self, function: FunctionHandle, name: &str) -> Vec<VariableRecord>;

    fn variable(&self, handle: VariableHandle) -> Option<VariableRecord>;

    /// Every global data symbol whose name matches `name` exactly.
    fn globals_named(&self, name: &str) -> Vec<GlobalRecord>;

    /// Disassembly of every instruction in the function. Order is not guaranteed.
    fn instructions(&self, function: FunctionHandle) -> Result<Vec<InstructionLine>, SourceError>;

    /// Decompiled high-level text of the function.
    fn decompiled(&self, function: FunctionHandle) -> Result<String, SourceError>;

    fn binary_info(&self) -> BinaryInfo;

    fn comment_at(&self, address: u64) -> Option<String>;

    fn rename_function(&self, function: FunctionHandle, new_name: &str)
        -> Result<(), SourceError>;

    fn rename_variable(&self, variable: VariableHandle, new_name: &str)
        -> Result<(), SourceError>;

    fn set_variable_type(&self, variable: VariableHandle, new_type: &str)
        -> Result<(), SourceError>;

    /// Set the comment at `address`, replacing any existing one.
    fn set_comment(&self, address: u64, comment: &str) -> Result<(), SourceError>;
}
