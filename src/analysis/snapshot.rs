//! JSON snapshot of an analysis database.
//!
//! A snapshot is what the engine-side exporter writes out: binary metadata,
//! functions with their instructions and decompiled text, globals and
//! comments. Loading one produces an [`InMemorySource`]; saving writes the
//! current (possibly renamed/commented) state back.

use crate::analysis::memory::InMemorySource;
use crate::analysis::types::{AddressRange, BinaryInfo, InstructionLine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub binary: BinaryInfo,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub globals: Vec<GlobalEntry>,
    #[serde(default)]
    pub comments: Vec<CommentEntry>,
    /// Cursor address at export time, if the exporter recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    pub start: u64,
    /// Address ranges covered by the function. Derived from the
    /// instructions when omitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<AddressRange>,
    #[serde(default)]
    pub instructions: Vec<InstructionLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decompiled: Option<String>,
    #[serde(default)]
    pub variables: Vec<VariableEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEntry {
    pub name: String,
    pub address: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub address: u64,
    pub comment: String,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build an in-memory analysis source from this snapshot.
    pub fn into_source(self) -> InMemorySource {
        InMemorySource::from_snapshot(self)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        for func in &self.functions {
            if func.name.trim().is_empty() {
                return Err(SnapshotError::Invalid(format!(
                    "function at {:#x} has an empty name",
                    func.start
                )));
            }
            if let Some(r) = func.ranges.iter().find(|r| r.is_empty()) {
                return Err(SnapshotError::Invalid(format!(
                    "function '{}' has an empty range {:#x}..{:#x}",
                    func.name, r.start, r.end
                )));
            }
            if func.ranges.is_empty() && func.derived_end().is_none() {
                return Err(SnapshotError::Invalid(format!(
                    "function '{}' at {:#x} runs past the end of the address space",
                    func.name, func.start
                )));
            }
        }
        Ok(())
    }
}

impl FunctionEntry {
    /// Ranges as recorded, or a single range spanning the instructions.
    pub(crate) fn effective_ranges(&self) -> Vec<AddressRange> {
        if !self.ranges.is_empty() {
            return self.ranges.clone();
        }
        vec![AddressRange {
            start: self.start,
            end: self.derived_end().unwrap_or(u64::MAX),
        }]
    }

    /// One past the last instruction (or the start), if that fits in a `u64`.
    fn derived_end(&self) -> Option<u64> {
        self.instructions
            .iter()
            .map(|i| i.address)
            .fold(self.start, u64::max)
            .checked_add(1)
    }
}
