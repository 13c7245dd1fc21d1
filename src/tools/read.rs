//! Read-only tools: disassembly, decompilation, globals, listings.
//!
//! These never take target locks and may run concurrently with each other.

use crate::disasm::render_listing;
use crate::error::ToolError;
use crate::resolver::ResolvedTarget;
use crate::tools::types::{
    BinaryInfoView, FunctionInfo, FunctionListResult, GlobalInfo, SegmentView,
};
use crate::tools::{
    function_target, global_target, HandlerContext, ParamKind, ParamSpec, TargetSpec,
    ToolArgs, ToolHandler, FUNCTION_NAME,
};
use serde::Serialize;
use tracing::debug;

const DEFAULT_LIST_LIMIT: u64 = 100;
const MAX_LIST_LIMIT: u64 = 10_000;

const NAMED_FUNCTION_PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    FUNCTION_NAME,
    ParamKind::Name,
    "Function name (exact match). Defaults to the function at the current cursor position.",
)];

fn function_spec(current_only: bool) -> TargetSpec {
    TargetSpec::Function {
        selector: if current_only { None } else { Some(FUNCTION_NAME) },
    }
}

fn function_params(current_only: bool) -> &'static [ParamSpec] {
    if current_only {
        &[]
    } else {
        NAMED_FUNCTION_PARAMS
    }
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ToolError::Unavailable(format!("failed to encode result: {e}")))
}

/// Linear disassembly of a function, one instruction per line.
pub struct GetFunctionAssembly {
    pub current_only: bool,
}

impl ToolHandler for GetFunctionAssembly {
    fn target(&self) -> TargetSpec {
        function_spec(self.current_only)
    }

    fn params(&self) -> &'static [ParamSpec] {
        function_params(self.current_only)
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        _args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let func = function_target(target)?;
        let lines = cx.source.instructions(func.handle)?;
        if lines.is_empty() {
            return Err(ToolError::Unavailable(format!(
                "Function '{}' has no disassembled instructions",
                func.name
            )));
        }
        debug!(function = %func.name, count = lines.len(), "Rendering assembly");
        Ok(render_listing(lines))
    }
}

/// Decompiled text of a function, verbatim.
pub struct GetFunctionDecompiled {
    pub current_only: bool,
}

impl ToolHandler for GetFunctionDecompiled {
    fn target(&self) -> TargetSpec {
        function_spec(self.current_only)
    }

    fn params(&self) -> &'static [ParamSpec] {
        function_params(self.current_only)
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        _args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let func = function_target(target)?;
        Ok(cx.source.decompiled(func.handle)?)
    }
}

pub struct GetGlobalVariable;

const GLOBAL_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "variable_name",
    ParamKind::Name,
    "Global variable name (exact match)",
)
.with_aliases(&["symbol_name", "name"])];

impl ToolHandler for GetGlobalVariable {
    fn target(&self) -> TargetSpec {
        TargetSpec::Global {
            name: "variable_name",
        }
    }

    fn params(&self) -> &'static [ParamSpec] {
        GLOBAL_PARAMS
    }

    fn invoke(
        &self,
        _cx: &HandlerContext<'_>,
        target: Option<&ResolvedTarget>,
        _args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let global = global_target(target)?;
        to_pretty(&GlobalInfo {
            name: global.name.clone(),
            address: format!("{:#x}", global.address),
            type_name: global
                .type_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            value: global.value.clone(),
        })
    }
}

pub struct ListFunctions;

const LIST_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("offset", ParamKind::Count, "Offset for pagination (default: 0)"),
    ParamSpec::optional(
        "limit",
        ParamKind::Count,
        "Maximum functions to return (1-10000, default: 100)",
    )
    .with_aliases(&["count"]),
    ParamSpec::optional(
        "filter",
        ParamKind::Text,
        "Only return functions whose name contains this text (case-insensitive)",
    )
    .with_aliases(&["query"]),
];

impl ToolHandler for ListFunctions {
    fn target(&self) -> TargetSpec {
        TargetSpec::None
    }

    fn params(&self) -> &'static [ParamSpec] {
        LIST_PARAMS
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        _target: Option<&ResolvedTarget>,
        args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let offset = args.count("offset").unwrap_or(0) as usize;
        let limit = args
            .count("limit")
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT) as usize;
        let filter_lower = args
            .text("filter")
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let mut functions = Vec::with_capacity(limit.min(256));
        let mut total = 0usize;

        for func in cx.source.functions() {
            if let Some(f) = &filter_lower {
                if !func.name.to_lowercase().contains(f) {
                    continue;
                }
            }

            total += 1;
            if total <= offset {
                continue;
            }
            if functions.len() >= limit {
                continue;
            }

            functions.push(FunctionInfo {
                address: format!("{:#x}", func.start),
                size: func.size(),
                name: func.name,
            });
        }

        let next_offset = if offset.saturating_add(functions.len()) < total {
            Some(offset.saturating_add(functions.len()))
        } else {
            None
        };

        to_pretty(&FunctionListResult {
            functions,
            total,
            next_offset,
        })
    }
}

pub struct GetBinaryInfo;

impl ToolHandler for GetBinaryInfo {
    fn target(&self) -> TargetSpec {
        TargetSpec::None
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn invoke(
        &self,
        cx: &HandlerContext<'_>,
        _target: Option<&ResolvedTarget>,
        _args: &ToolArgs,
    ) -> Result<String, ToolError> {
        let info = cx.source.binary_info();
        let function_count = cx.source.functions().len();
        to_pretty(&BinaryInfoView {
            filename: info.filename,
            arch: info.arch,
            platform: info.platform,
            entry_point: format!("{:#x}", info.entry_point),
            start: format!("{:#x}", info.start),
            end: format!("{:#x}", info.end),
            length: info.end.saturating_sub(info.start),
            address_size: info.address_size,
            endianness: info.endianness,
            function_count,
            segments: info
                .segments
                .iter()
                .map(|s| SegmentView {
                    start: format!("{:#x}", s.start),
                    end: format!("{:#x}", s.end),
                    length: s.end.saturating_sub(s.start),
                    permissions: format!(
                        "{}{}{}",
                        if s.readable { 'r' } else { '-' },
                        if s.writable { 'w' } else { '-' },
                        if s.executable { 'x' } else { '-' }
                    ),
                })
                .collect(),
        })
    }
}
