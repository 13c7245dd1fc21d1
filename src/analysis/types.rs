//! Records and handles exchanged with the analysis data source.
//!
//! Handles are lookup keys into the source, never owners of the underlying
//! objects. A handle obtained in one call may stop resolving after later
//! analysis changes, so callers re-resolve on every request.

use serde::{Deserialize, Serialize};

/// Opaque reference to a function in the analysis database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionHandle(pub u64);

/// Opaque reference to a local variable, scoped to its owning function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableHandle {
    pub function: FunctionHandle,
    pub index: u32,
}

/// Opaque reference to a global data symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalHandle(pub u64);

/// Half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub handle: FunctionHandle,
    pub name: String,
    pub start: u64,
    /// A function may span several disjoint ranges.
    pub ranges: Vec<AddressRange>,
}

impl FunctionRecord {
    pub fn contains(&self, address: u64) -> bool {
        self.ranges.iter().any(|r| r.contains(address))
    }

    /// Total number of bytes covered by the function's ranges.
    pub fn size(&self) -> u64 {
        self.ranges.iter().map(AddressRange::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRecord {
    pub handle: VariableHandle,
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalRecord {
    pub handle: GlobalHandle,
    pub name: String,
    pub address: u64,
    pub type_name: Option<String>,
    /// Statically known value or initializer, already rendered as text.
    pub value: Option<String>,
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionLine {
    pub address: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub start: u64,
    pub end: u64,
    #[serde(default)]
    pub readable: bool,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub executable: bool,
}

/// Binary-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BinaryInfo {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub entry_point: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default = "default_address_size")]
    pub address_size: u32,
    #[serde(default = "default_endianness")]
    pub endianness: String,
    #[serde(default)]
    pub segments: Vec<SegmentInfo>,
}

fn default_address_size() -> u32 {
    8
}

fn default_endianness() -> String {
    "little_endian".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_half_open() {
        let r = AddressRange {
            start: 0x1000,
            end: 0x1010,
        };
        assert!(r.contains(0x1000));
        assert!(r.contains(0x100f));
        assert!(!r.contains(0x1010));
        assert_eq!(r.len(), 0x10);
    }

    #[test]
    fn function_size_sums_disjoint_ranges() {
        let f = FunctionRecord {
            handle: FunctionHandle(0),
            name: "split".to_string(),
            start: 0x1000,
            ranges: vec![
                AddressRange {
                    start: 0x1000,
                    end: 0x1008,
                },
                AddressRange {
                    start: 0x2000,
                    end: 0x2004,
                },
            ],
        };
        assert_eq!(f.size(), 12);
        assert!(f.contains(0x2002));
        assert!(!f.contains(0x1800));
    }
}
