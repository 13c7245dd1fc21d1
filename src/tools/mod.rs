//! Tool handlers organized by domain.
//!
//! Each tool is a handler value implementing [`ToolHandler`]: it declares the
//! kind of target it operates on and the parameters it accepts, and turns a
//! resolved target plus validated arguments into a text payload.

pub mod args;
pub mod edit;
pub mod read;
pub mod types;

pub use args::{parse_address, ParamKind, ParamSpec, ToolArgs};

use crate::analysis::{AnalysisSource, FunctionRecord, GlobalRecord, VariableRecord};
use crate::error::ToolError;
use crate::locks::TargetLocks;
use crate::resolver::{ResolvedTarget, TargetQuery};
use tokio_util::sync::CancellationToken;

/// Argument key naming the target function.
pub const FUNCTION_NAME: &str = "function_name";

/// Kind of target a tool operates on and where its name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSpec {
    /// Database-wide tool; nothing to resolve.
    None,
    /// A function named by `selector`, falling back to the current function
    /// when the argument is absent. `selector: None` always uses the current
    /// function.
    Function { selector: Option<&'static str> },
    /// A local variable named by `variable` inside the function named by
    /// `function` (or the current function).
    Variable {
        function: &'static str,
        variable: &'static str,
    },
    /// A global data symbol named by `name`.
    Global { name: &'static str },
}

impl TargetSpec {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Function { selector: None } => "current function",
            Self::Function { .. } => "function",
            Self::Variable { .. } => "variable",
            Self::Global { .. } => "global variable",
        }
    }

    /// Build the resolver query from validated arguments.
    pub fn query<'a>(&self, args: &'a ToolArgs) -> Result<Option<TargetQuery<'a>>, ToolError> {
        Ok(match *self {
            Self::None => None,
            Self::Function { selector } => {
                Some(TargetQuery::Function(selector.and_then(|key| args.text(key))))
            }
            Self::Variable { function, variable } => Some(TargetQuery::Variable {
                function: args.text(function),
                variable: args.require_text(variable)?,
            }),
            Self::Global { name } => Some(TargetQuery::Global(args.require_text(name)?)),
        })
    }
}

/// Collaborators available to a handler for the duration of one call.
pub struct HandlerContext<'a> {
    pub source: &'a dyn AnalysisSource,
    pub locks: &'a TargetLocks,
    pub cancel: &'a CancellationToken,
}

impl HandlerContext<'_> {
    /// Fail with `Cancelled` if the caller has abandoned this call.
    pub fn ensure_live(&self) -> Result<(), ToolError> {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        Ok(())
    }
}

pub trait ToolHandler: Send + Sync {
    fn target(&self) -> TargetSpec;

    fn params(&self) -> &'static [ParamSpec];

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        args: &ToolArgs,
    ) -> Result<String, ToolError>;
}

// Target accessors. The dispatcher always resolves the kind a handler
// declares, so a mismatch is a registry bug surfaced as an argument error.

pub(crate) fn function_target(target: Option<&ResolvedTarget>) -> Result<&FunctionRecord, ToolError> {
    target
        .and_then(ResolvedTarget::as_function)
        .ok_or_else(|| ToolError::InvalidArgument("tool requires a function target".to_string()))
}

pub(crate) fn variable_target(
    target: Option<&ResolvedTarget>,
) -> Result<(&FunctionRecord, &VariableRecord), ToolError> {
    target
        .and_then(ResolvedTarget::as_variable)
        .ok_or_else(|| ToolError::InvalidArgument("tool requires a variable target".to_string()))
}

pub(crate) fn global_target(target: Option<&ResolvedTarget>) -> Result<&GlobalRecord, ToolError> {
    target
        .and_then(ResolvedTarget::as_global)
        .ok_or_else(|| ToolError::InvalidArgument("tool requires a global variable target".to_string()))
}
