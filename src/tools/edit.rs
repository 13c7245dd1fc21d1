//! Mutation tools: renames, variable retyping, comments.
//!
//! Every mutation holds the target's lock for the duration of the change and
//! re-reads the target under it, so two calls on the same target never
//! interleave and the second one sees the first one's result.

use crate::analysis::{FunctionRecord, VariableRecord};
use crate::error::ToolError;
use crate::locks::TargetGuard;
use crate::resolver::ResolvedTarget;
use crate::tools::{
    function_target, variable_target, HandlerContext, ParamKind, ParamSpec, TargetSpec, ToolArgs,
    ToolHandler, FUNCTION_NAME,
};
use tracing::info;

const NEW_NAME: ParamSpec = ParamSpec::required("new_name", ParamKind::Name, "New name");

const RENAME_FUNCTION_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional(
        FUNCTION_NAME,
        ParamKind::Name,
        "Function to rename (exact match). Defaults to the current function.",
    ),
    NEW_NAME,
];

const RENAME_CURRENT_PARAMS: &[ParamSpec] = &[NEW_NAME];

const VARIABLE_PARAMS_HEAD: [ParamSpec; 2] = [
    ParamSpec::optional(
        FUNCTION_NAME,
        ParamKind::Name,
        "Function containing the variable. Defaults to the current function.",
    ),
    ParamSpec::required("variable_name", ParamKind::Name, "Local variable name (exact match)"),
];

const RENAME_VARIABLE_PARAMS: &[ParamSpec] =
    &[VARIABLE_PARAMS_HEAD[0], VARIABLE_PARAMS_HEAD[1], NEW_NAME];

const SET_TYPE_PARAMS: &[ParamSpec] = &[
    VARIABLE_PARAMS_HEAD[0],
    VARIABLE_PARAMS_HEAD[1],
    ParamSpec::required(
        "new_type",
        ParamKind::Name,
        "Type declaration understood by the engine (e.g. 'uint32_t', 'char*')",
    ),
];

const COMMENT_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional(
        FUNCTION_NAME,
        ParamKind::Name,
        "Function the address belongs to. Defaults to the current function.",
    ),
    ParamSpec::required("address", ParamKind::Address, "Address of the commented instruction")
        .with_aliases(&["ea", "addr"]),
    ParamSpec::required(
        "comment",
        ParamKind::Text,
        "Comment text. Replaces any existing comment; empty text clears it.",
    ),
];

const VARIABLE_SPEC: TargetSpec = TargetSpec::Variable {
    function: FUNCTION_NAME,
    variable: "variable_name",
};

/// Take the target's lock, then re-read the function under it.
fn lock_function<'a>(
    cx: &HandlerContext<'a>,
    target: &ResolvedTarget,
    resolved: &FunctionRecord,
) -> Result<(TargetGuard<'a>, FunctionRecord), ToolError> {
    let guard = cx.locks.acquire(target.lock_key(), cx.cancel)?;
    let current = cx.source.function(resolved.handle).ok_or_else(|| {
        ToolError::NotFound(format!(
            "Function '{}' no longer exists in the analysis database",
            resolved.name
        ))
    })?;
    cx.ensure_live()?;
    Ok((guard, current))
}

fn lock_variable<'a>(
    cx: &HandlerContext<'a>,
    target: &ResolvedTarget,
    function: &FunctionRecord,
    resolved: &VariableRecord,
) -> Result<(TargetGuard<'a>, VariableRecord), ToolError> {
    let guard = cx.locks.acquire(target.lock_key(), cx.cancel)?;
    let current = cx.source.variable(resolved.handle).ok_or_else(|| {
        ToolError::NotFound(format!(
            "Variable '{}' no longer exists in function '{}'",
            resolved.name, function.name
        ))
    })?;
    cx.ensure_live()?;
    Ok((guard, current))
}

pub struct RenameFunction {
    pub current_only: bool,
}

impl ToolHandler for RenameFunction {
    fn target(&self) -> TargetSpec {
        TargetSpec::Function {
            selector: if self.current_only {
                None
            } else {
                Some(FUNCTION_NAME)
            },
        }
    }

    fn params(&self) -> &'static [ParamSpec] {
        if self.current_only {
            RENAME_CURRENT_PARAMS
        } else {
            RENAME_FUNCTION_PARAMS
        }
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let new_name = args.require_text("new_name")?;
        let resolved = function_target(target)?;
        let target = target.ok_or_else(|| {
            ToolError::InvalidArgument("tool requires a function target".to_string())
        })?;

        let (_guard, func) = lock_function(cx, target, resolved)?;
        cx.source.rename_function(func.handle, new_name)?;
        info!(from = %func.name, to = new_name, "Renamed function");
        Ok(format!("Function '{}' renamed to '{new_name}'", func.name))
    }
}

pub struct RenameVariable;

impl ToolHandler for RenameVariable {
    fn target(&self) -> TargetSpec {
        VARIABLE_SPEC
    }

    fn params(&self) -> &'static [ParamSpec] {
        RENAME_VARIABLE_PARAMS
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let new_name = args.require_text("new_name")?;
        let (func, resolved) = variable_target(target)?;
        let target = target.ok_or_else(|| {
            ToolError::InvalidArgument("tool requires a variable target".to_string())
        })?;

        let (_guard, var) = lock_variable(cx, target, func, resolved)?;
        cx.source.rename_variable(var.handle, new_name)?;
        info!(function = %func.name, from = %var.name, to = new_name, "Renamed variable");
        Ok(format!(
            "Variable '{}' in function '{}' renamed to '{new_name}'",
            var.name, func.name
        ))
    }
}

pub struct SetVariableType;

impl ToolHandler for SetVariableType {
    fn target(&self) -> TargetSpec {
        VARIABLE_SPEC
    }

    fn params(&self) -> &'static [ParamSpec] {
        SET_TYPE_PARAMS
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let new_type = args.require_text("new_type")?;
        let (func, resolved) = variable_target(target)?;
        let target = target.ok_or_else(|| {
            ToolError::InvalidArgument("tool requires a variable target".to_string())
        })?;

        let (_guard, var) = lock_variable(cx, target, func, resolved)?;
        cx.source.set_variable_type(var.handle, new_type)?;
        info!(function = %func.name, variable = %var.name, new_type, "Set variable type");
        Ok(format!(
            "Variable '{}' in function '{}' type set to '{new_type}'",
            var.name, func.name
        ))
    }
}

pub struct AddComment;

impl ToolHandler for AddComment {
    fn target(&self) -> TargetSpec {
        TargetSpec::Function {
            selector: Some(FUNCTION_NAME),
        }
    }

    fn params(&self) -> &'static [ParamSpec] {
        COMMENT_PARAMS
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let address = args.require_address("address")?;
        let comment = args.require_text("comment")?;
        let resolved = function_target(target)?;
        if !resolved.contains(address) {
            return Err(ToolError::InvalidArgument(format!(
                "address {address:#x} is outside function '{}'",
                resolved.name
            )));
        }
        let target = target.ok_or_else(|| {
            ToolError::InvalidArgument("tool requires a function target".to_string())
        })?;

        let (_guard, func) = lock_function(cx, target, resolved)?;
        // Ranges can change between resolution and locking.
        if !func.contains(address) {
            return Err(ToolError::InvalidArgument(format!(
                "address {address:#x} is outside function '{}'",
                func.name
            )));
        }
        cx.source.set_comment(address, comment)?;
        info!(function = %func.name, address = %format!("{address:#x}"), "Set comment");
        Ok(format!("Comment set at address {address:#x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSource, InMemorySource, Snapshot};
    use crate::error::FailureKind;
    use crate::locks::TargetLocks;
    use crate::resolver::SymbolResolver;
    use crate::session::SessionContext;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    fn source() -> InMemorySource {
        Snapshot::from_json(
            r#"{
                "binary": {"filename": "a.out", "arch": "x86_64", "platform": "linux-x86_64",
                           "entry_point": 4096, "start": 0, "end": 65536},
                "functions": [
                    {"name": "sub_1000", "start": 4096, "ranges": [{"start": 4096, "end": 4128}],
                     "variables": [{"name": "var_8", "type": "int32_t"},
                                   {"name": "arg1", "type": "char*"}]},
                    {"name": "helper", "start": 8192, "ranges": [{"start": 8192, "end": 8208}]}
                ]
            }"#,
        )
        .expect("valid snapshot")
        .into_source()
    }

    fn run_with(
        handler: &dyn ToolHandler,
        src: &InMemorySource,
        session: &SessionContext,
        cancel: &CancellationToken,
        raw: Value,
    ) -> Result<String, ToolError> {
        let args = ToolArgs::validate(handler.params(), raw.as_object().expect("object"))?;
        let target = match handler.target().query(&args)? {
            Some(q) => Some(SymbolResolver::new(src, session).resolve(q)?),
            None => None,
        };
        let locks = TargetLocks::new();
        let cx = HandlerContext {
            source: src,
            locks: &locks,
            cancel,
        };
        handler.invoke(&cx, target.as_ref(), &args)
    }

    fn run(handler: &dyn ToolHandler, src: &InMemorySource, raw: Value) -> Result<String, ToolError> {
        run_with(handler, src, &SessionContext::new(), &CancellationToken::new(), raw)
    }

    #[test]
    fn rename_function_confirms_and_applies() {
        let src = source();
        let msg = run(
            &RenameFunction { current_only: false },
            &src,
            json!({"function_name": "sub_1000", "new_name": "parse_header"}),
        )
        .expect("rename");
        assert_eq!(msg, "Function 'sub_1000' renamed to 'parse_header'");
        assert_eq!(src.functions_named("parse_header").len(), 1);
        assert!(src.functions_named("sub_1000").is_empty());
    }

    #[test]
    fn rename_to_taken_name_is_mutation_failure() {
        let src = source();
        let err = run(
            &RenameFunction { current_only: false },
            &src,
            json!({"function_name": "sub_1000", "new_name": "helper"}),
        )
        .expect_err("duplicate name");
        assert_eq!(err.kind(), FailureKind::MutationFailed);
        assert_eq!(src.functions_named("sub_1000").len(), 1);
    }

    #[test]
    fn rename_current_function_uses_session() {
        let src = source();
        let session = SessionContext::new();
        session.set_current(src.function_containing(0x2004).map(|f| f.handle));
        let msg = run_with(
            &RenameFunction { current_only: true },
            &src,
            &session,
            &CancellationToken::new(),
            json!({"new_name": "do_help"}),
        )
        .expect("rename current");
        assert_eq!(msg, "Function 'helper' renamed to 'do_help'");
    }

    #[test]
    fn rename_current_without_context() {
        let src = source();
        let err = run(
            &RenameFunction { current_only: true },
            &src,
            json!({"new_name": "x"}),
        )
        .expect_err("no cursor");
        assert_eq!(err.kind(), FailureKind::NoCurrentContext);
    }

    #[test]
    fn rename_and_retype_variable() {
        let src = source();
        let msg = run(
            &RenameVariable,
            &src,
            json!({"function_name": "sub_1000", "variable_name": "var_8", "new_name": "count"}),
        )
        .expect("rename variable");
        assert_eq!(msg, "Variable 'var_8' in function 'sub_1000' renamed to 'count'");

        let msg = run(
            &SetVariableType,
            &src,
            json!({"function_name": "sub_1000", "variable_name": "count", "new_type": "size_t"}),
        )
        .expect("retype");
        assert_eq!(msg, "Variable 'count' in function 'sub_1000' type set to 'size_t'");

        let func = src.functions_named("sub_1000").remove(0);
        let vars = src.variables_named(func.handle, "count");
        assert_eq!(vars[0].type_name, "size_t");
    }

    #[test]
    fn rename_variable_onto_sibling_fails() {
        let src = source();
        let err = run(
            &RenameVariable,
            &src,
            json!({"function_name": "sub_1000", "variable_name": "var_8", "new_name": "arg1"}),
        )
        .expect_err("duplicate variable");
        assert_eq!(err.kind(), FailureKind::MutationFailed);
    }

    #[test]
    fn add_comment_is_idempotent() {
        let src = source();
        let raw = json!({"function_name": "sub_1000", "address": "0x1004", "comment": "checks magic"});
        let first = run(&AddComment, &src, raw.clone()).expect("first");
        let second = run(&AddComment, &src, raw).expect("second");
        assert_eq!(first, second);
        assert_eq!(src.comment_at(0x1004).as_deref(), Some("checks magic"));

        run(
            &AddComment,
            &src,
            json!({"function_name": "sub_1000", "ea": 4100, "comment": "replaced"}),
        )
        .expect("overwrite");
        assert_eq!(src.comment_at(0x1004).as_deref(), Some("replaced"));
    }

    #[test]
    fn add_comment_outside_function() {
        let src = source();
        let err = run(
            &AddComment,
            &src,
            json!({"function_name": "sub_1000", "address": "0x2000", "comment": "x"}),
        )
        .expect_err("outside");
        assert_eq!(err.kind(), FailureKind::InvalidArgument);
        assert_eq!(src.comment_at(0x2000), None);
    }

    #[test]
    fn cancelled_call_changes_nothing() {
        let src = source();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_with(
            &RenameFunction { current_only: false },
            &src,
            &SessionContext::new(),
            &cancel,
            json!({"function_name": "sub_1000", "new_name": "never"}),
        )
        .expect_err("cancelled");
        assert_eq!(err.kind(), FailureKind::Cancelled);
        assert!(src.functions_named("never").is_empty());
    }
}
