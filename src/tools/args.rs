//! Per-tool argument schemas and validation.
//!
//! Arguments arrive as a loosely typed JSON object. They are checked once,
//! against the tool's declared parameters, before any symbol is resolved, so
//! handlers only ever see well-typed values.

use crate::error::ToolError;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Any string, including the empty string.
    Text,
    /// A non-empty string. Whether it is a legal name is the data source's call.
    Name,
    /// An address: integer, or string in hex (0x), binary (0b), octal (0o) or decimal.
    Address,
    /// A non-negative integer count (number or numeric string).
    Count,
}

impl ParamKind {
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::Text | Self::Name => "string",
            Self::Address => "string|integer",
            Self::Count => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Alternate keys accepted for this parameter.
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            aliases: &[],
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            aliases: &[],
            description,
        }
    }

    pub const fn with_aliases(self, aliases: &'static [&'static str]) -> Self {
        Self { aliases, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgValue {
    Text(String),
    Address(u64),
    Count(u64),
}

/// Validated arguments for one call, keyed by canonical parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArgs {
    values: HashMap<&'static str, ArgValue>,
}

impl ToolArgs {
    /// Check `raw` against `params`. Null values count as absent; keys not in
    /// the schema are ignored.
    pub fn validate(params: &[ParamSpec], raw: &Map<String, Value>) -> Result<Self, ToolError> {
        let mut values = HashMap::with_capacity(params.len());
        for spec in params {
            let found = std::iter::once(spec.name)
                .chain(spec.aliases.iter().copied())
                .find_map(|key| raw.get(key).filter(|v| !v.is_null()));
            let Some(value) = found else {
                if spec.required {
                    return Err(ToolError::InvalidArgument(format!(
                        "missing required argument '{}'",
                        spec.name
                    )));
                }
                continue;
            };
            values.insert(spec.name, convert(spec, value)?);
        }
        Ok(Self { values })
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn address(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(ArgValue::Address(a)) => Some(*a),
            _ => None,
        }
    }

    pub fn count(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(ArgValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    /// Required text argument. Validation guarantees presence for required
    /// parameters; this only fails if a handler asks for an undeclared one.
    pub fn require_text(&self, name: &str) -> Result<&str, ToolError> {
        self.text(name)
            .ok_or_else(|| ToolError::InvalidArgument(format!("missing required argument '{name}'")))
    }

    pub fn require_address(&self, name: &str) -> Result<u64, ToolError> {
        self.address(name)
            .ok_or_else(|| ToolError::InvalidArgument(format!("missing required argument '{name}'")))
    }
}

fn convert(spec: &ParamSpec, value: &Value) -> Result<ArgValue, ToolError> {
    let mismatch = || {
        ToolError::InvalidArgument(format!(
            "argument '{}' must be {}",
            spec.name,
            spec.kind.json_type()
        ))
    };
    match spec.kind {
        ParamKind::Text => match value {
            Value::String(s) => Ok(ArgValue::Text(s.clone())),
            _ => Err(mismatch()),
        },
        ParamKind::Name => match value {
            Value::String(s) if s.is_empty() => Err(ToolError::InvalidArgument(format!(
                "argument '{}' must not be empty",
                spec.name
            ))),
            Value::String(s) => Ok(ArgValue::Text(s.clone())),
            _ => Err(mismatch()),
        },
        ParamKind::Address => match value {
            Value::Number(n) => n.as_u64().map(ArgValue::Address).ok_or_else(mismatch),
            Value::String(s) => parse_address(s).map(ArgValue::Address),
            _ => Err(mismatch()),
        },
        ParamKind::Count => match value {
            Value::Number(n) => n.as_u64().map(ArgValue::Count).ok_or_else(mismatch),
            Value::String(s) => s.trim().parse().map(ArgValue::Count).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
    }
}

/// Parse an address string supporting hex (0x), binary (0b), octal (0o), and decimal.
/// Underscores are ignored.
pub fn parse_address(s: &str) -> Result<u64, ToolError> {
    let mut cleaned = s.trim().to_string();
    cleaned.retain(|c| c != '_');
    let invalid = || ToolError::InvalidArgument(format!("invalid address: {s}"));
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).map_err(|_| invalid())
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).map_err(|_| invalid())
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u64::from_str_radix(oct, 8).map_err(|_| invalid())
    } else {
        lower.parse::<u64>().map_err(|_| invalid())
    }
}
