//! Current-function context.
//!
//! Holds the function implicitly selected by the user's cursor. The value is
//! a handle, not the function itself: the analysis database owns the function
//! and the resolver re-looks it up on every call.

use crate::analysis::FunctionHandle;
use std::sync::RwLock;

/// Process-wide "current function" slot.
///
/// Starts empty and is only written by the external event source (cursor
/// movement). Tool handlers never write it.
#[derive(Debug, Default)]
pub struct SessionContext {
    current: RwLock<Option<FunctionHandle>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, function: Option<FunctionHandle>) {
        let mut slot = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = function;
    }

    pub fn current(&self) -> Option<FunctionHandle> {
        match self.current.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
