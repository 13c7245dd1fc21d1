//! Tool dispatch.
//!
//! Routes a named tool call through argument validation, symbol resolution
//! and the tool's handler, and packages the outcome as a [`ToolResult`].
//! Every failure is recovered here; nothing escapes as a panic or a fatal
//! error, and a failed call leaves the session untouched.

use crate::analysis::{AnalysisSource, FunctionRecord};
use crate::error::{failure_result, FailureKind, ToolError};
use crate::locks::TargetLocks;
use crate::resolver::SymbolResolver;
use crate::session::SessionContext;
use crate::tool_registry;
use crate::tools::{HandlerContext, ToolArgs};
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Default timeout for a tool call (2 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Maximum allowed timeout (10 minutes)
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Clamp a requested timeout to the allowed range.
pub fn effective_timeout(timeout_secs: Option<u64>) -> Duration {
    Duration::from_secs(
        timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS),
    )
}

/// One tool invocation as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build a request from any serializable parameter struct. Fields that
    /// serialize to null are dropped.
    pub fn from_params<T: Serialize>(name: &str, params: &T) -> Self {
        let arguments = match serde_json::to_value(params) {
            Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            _ => Map::new(),
        };
        Self::new(name, arguments)
    }
}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { payload: String },
    Failure { kind: FailureKind, message: String },
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_call_tool_result(self) -> CallToolResult {
        match self {
            Self::Success { payload } => CallToolResult::success(vec![Content::text(payload)]),
            Self::Failure { kind, message } => failure_result(kind, &message),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(e: ToolError) -> Self {
        Self::Failure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(r: Result<String, ToolError>) -> Self {
        match r {
            Ok(payload) => Self::Success { payload },
            Err(e) => e.into(),
        }
    }
}

pub struct Dispatcher {
    source: Arc<dyn AnalysisSource>,
    session: SessionContext,
    locks: TargetLocks,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn AnalysisSource>) -> Self {
        Self {
            source,
            session: SessionContext::new(),
            locks: TargetLocks::new(),
        }
    }

    pub fn source(&self) -> &dyn AnalysisSource {
        self.source.as_ref()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Cursor moved to `address`: the function containing it becomes the
    /// current function, or the context is cleared if there is none.
    pub fn move_cursor(&self, address: u64) -> Option<FunctionRecord> {
        let func = self.source.function_containing(address);
        self.session.set_current(func.as_ref().map(|f| f.handle));
        match &func {
            Some(f) => debug!(address = %format!("{address:#x}"), function = %f.name, "Cursor moved"),
            None => debug!(address = %format!("{address:#x}"), "Cursor outside any function"),
        }
        func
    }

    pub fn dispatch(&self, request: &ToolRequest) -> ToolResult {
        self.dispatch_with_cancel(request, &CancellationToken::new())
    }

    #[instrument(skip_all, fields(tool = %request.name))]
    pub fn dispatch_with_cancel(
        &self,
        request: &ToolRequest,
        cancel: &CancellationToken,
    ) -> ToolResult {
        debug!("Tool call");
        let outcome = self.run(request, cancel);
        if let Err(e) = &outcome {
            match e.kind() {
                FailureKind::MutationFailed | FailureKind::Unavailable | FailureKind::Cancelled => {
                    warn!(kind = %e.kind(), error = %e, "Tool call failed")
                }
                _ => debug!(kind = %e.kind(), error = %e, "Tool call failed"),
            }
        }
        outcome.into()
    }

    fn run(&self, request: &ToolRequest, cancel: &CancellationToken) -> Result<String, ToolError> {
        let tool = tool_registry::get_tool(&request.name).ok_or_else(|| {
            ToolError::InvalidArgument(format!("unknown tool: {}", request.name))
        })?;
        let handler = tool.handler;
        let args = ToolArgs::validate(handler.params(), &request.arguments)?;
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let target = match handler.target().query(&args)? {
            Some(query) => Some(SymbolResolver::new(self.source(), &self.session).resolve(query)?),
            None => None,
        };

        let cx = HandlerContext {
            source: self.source(),
            locks: &self.locks,
            cancel,
        };
        handler.invoke(&cx, target.as_ref(), &args)
    }

    /// Run a call on the blocking pool, bounded by `timeout`.
    ///
    /// On timeout the call's cancellation token fires: a handler still
    /// validating or waiting for its target lock gives up without mutating.
    pub async fn call(self: &Arc<Self>, request: ToolRequest, timeout: Duration) -> ToolResult {
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let this = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || {
            this.dispatch_with_cancel(&request, &worker_cancel)
        });
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => ToolError::from(join).into(),
            Err(_) => {
                cancel.cancel();
                ToolError::Timeout(timeout).into()
            }
        }
    }
}
