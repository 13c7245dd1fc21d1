//! Response types for structured tool payloads.

use serde::Serialize;

/// Function info for listing
#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    pub address: String,
    pub name: String,
    pub size: u64,
}

/// Paginated function list result
#[derive(Debug, Clone, Serialize)]
pub struct FunctionListResult {
    pub functions: Vec<FunctionInfo>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalInfo {
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Statically known value or initializer; null when unknown.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentView {
    pub start: String,
    pub end: String,
    pub length: u64,
    pub permissions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryInfoView {
    pub filename: String,
    pub arch: String,
    pub platform: String,
    pub entry_point: String,
    pub start: String,
    pub end: String,
    pub length: u64,
    pub address_size: u32,
    pub endianness: String,
    pub function_count: usize,
    pub segments: Vec<SegmentView>,
}
