//! Symbol resolution.
//!
//! Maps a user-supplied name, or the current-function context, to a concrete
//! target in the analysis database. Resolution is read-only and is redone on
//! every call; a [`ResolvedTarget`] must not be kept beyond the call that
//! produced it.

use crate::analysis::{AnalysisSource, FunctionRecord, GlobalRecord, VariableRecord};
use crate::error::ToolError;
use crate::locks::TargetKey;
use crate::session::SessionContext;

/// Maximum number of candidate addresses listed in an ambiguity message.
const MAX_LISTED_CANDIDATES: usize = 5;

/// What the caller asked to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetQuery<'a> {
    /// A function by exact name, or the current function when `None`.
    Function(Option<&'a str>),
    /// A local variable of a function (named, or the current one).
    Variable {
        function: Option<&'a str>,
        variable: &'a str,
    },
    /// A global data symbol by exact name.
    Global(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Function(FunctionRecord),
    Variable {
        function: FunctionRecord,
        variable: VariableRecord,
    },
    GlobalVariable(GlobalRecord),
}

impl ResolvedTarget {
    /// Key used to serialize mutations on this target.
    pub fn lock_key(&self) -> TargetKey {
        match self {
            Self::Function(f) => TargetKey::Function(f.handle),
            Self::Variable { variable, .. } => TargetKey::Variable(variable.handle),
            Self::GlobalVariable(g) => TargetKey::Global(g.handle),
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRecord> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<(&FunctionRecord, &VariableRecord)> {
        match self {
            Self::Variable { function, variable } => Some((function, variable)),
            _ => None,
        }
    }

    pub fn as_global(&self) -> Option<&GlobalRecord> {
        match self {
            Self::GlobalVariable(g) => Some(g),
            _ => None,
        }
    }
}

pub struct SymbolResolver<'a> {
    source: &'a dyn AnalysisSource,
    session: &'a SessionContext,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(source: &'a dyn AnalysisSource, session: &'a SessionContext) -> Self {
        Self { source, session }
    }

    pub fn resolve(&self, query: TargetQuery<'_>) -> Result<ResolvedTarget, ToolError> {
        match query {
            TargetQuery::Function(name) => self.function(name).map(ResolvedTarget::Function),
            TargetQuery::Variable { function, variable } => {
                let function = self.function(function)?;
                let variable = self.variable(&function, variable)?;
                Ok(ResolvedTarget::Variable { function, variable })
            }
            TargetQuery::Global(name) => self.global(name).map(ResolvedTarget::GlobalVariable),
        }
    }

    fn function(&self, name: Option<&str>) -> Result<FunctionRecord, ToolError> {
        let Some(name) = name else {
            return self.current_function();
        };
        let mut matches = self.source.functions_named(name);
        match matches.len() {
            0 => Err(ToolError::NotFound(format!("Function '{name}' not found"))),
            1 => Ok(matches.remove(0)),
            count => Err(ToolError::Ambiguous {
                what: "Function",
                name: name.to_string(),
                count,
                candidates: list_addresses(matches.iter().map(|f| f.start)),
            }),
        }
    }

    fn current_function(&self) -> Result<FunctionRecord, ToolError> {
        let handle = self.session.current().ok_or_else(|| {
            ToolError::NoCurrentContext("No function is selected at the current position".to_string())
        })?;
        self.source.function(handle).ok_or_else(|| {
            ToolError::NoCurrentContext(
                "The current function no longer exists in the analysis database".to_string(),
            )
        })
    }

    fn variable(&self, function: &FunctionRecord, name: &str) -> Result<VariableRecord, ToolError> {
        let mut matches = self.source.variables_named(function.handle, name);
        match matches.len() {
            0 => Err(ToolError::NotFound(format!(
                "Variable '{name}' not found in function '{}'",
                function.name
            ))),
            1 => Ok(matches.remove(0)),
            count => Err(ToolError::Ambiguous {
                what: "Variable",
                name: name.to_string(),
                count,
                candidates: format!("in function '{}'", function.name),
            }),
        }
    }

    fn global(&self, name: &str) -> Result<GlobalRecord, ToolError> {
        let mut matches = self.source.globals_named(name);
        match matches.len() {
            0 => Err(ToolError::NotFound(format!(
                "Global variable '{name}' not found"
            ))),
            1 => Ok(matches.remove(0)),
            count => Err(ToolError::Ambiguous {
                what: "Global variable",
                name: name.to_string(),
                count,
                candidates: list_addresses(matches.iter().map(|g| g.address)),
            }),
        }
    }
}

fn list_addresses(addrs: impl Iterator<Item = u64>) -> String {
    let addrs: Vec<u64> = addrs.collect();
    let mut listed: Vec<String> = addrs
        .iter()
        .take(MAX_LISTED_CANDIDATES)
        .map(|a| format!("{a:#x}"))
        .collect();
    if addrs.len() > MAX_LISTED_CANDIDATES {
        listed.push(format!("and {} more", addrs.len() - MAX_LISTED_CANDIDATES));
    }
    listed.join(", ")
}
