//! Tool identifiers.
//!
//! A tool name is any non-empty string. Callers that want names safe to put in
//! paths, metrics labels or URLs can opt into [`ToolName::parse_strict`].
//!
//! # Strict Rules
//!
//! - At most 128 characters
//! - No leading or trailing whitespace
//! - Only alphanumeric characters, hyphens (`-`), underscores (`_`) and dots (`.`)
//! - No `..` sequences
//!
//! ```rust
//! use triagent_core::ToolName;
//!
//! assert!(ToolName::new("policy check").is_ok());
//! assert!(ToolName::new("").is_err());
//! assert!(ToolName::parse_strict("policy_check").is_ok());
//! assert!(ToolName::parse_strict("policy check").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of a strictly parsed tool name.
pub const MAX_TOOL_NAME_LENGTH: usize = 128;

/// Reasons a tool name can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdValidationError {
    #[error("Identifier cannot be empty")]
    Empty,
    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,
    #[error(
        "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
    )]
    InvalidCharacters,
    #[error("Identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },
    #[error("Identifier cannot contain path traversal sequences (..)")]
    PathTraversal,
}

/// Unique name of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    /// Accept any non-empty name.
    pub fn new(name: impl Into<String>) -> Result<Self, IdValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(IdValidationError::Empty);
        }
        Ok(Self(name))
    }

    /// Accept only names that follow the strict identifier rules.
    pub fn parse_strict(name: impl AsRef<str>) -> Result<Self, IdValidationError> {
        let name = name.as_ref();

        if name.is_empty() {
            return Err(IdValidationError::Empty);
        }
        if name.trim() != name {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }
        if name.len() > MAX_TOOL_NAME_LENGTH {
            return Err(IdValidationError::TooLong {
                length: name.len(),
                max: MAX_TOOL_NAME_LENGTH,
            });
        }
        if name.contains("..") {
            return Err(IdValidationError::PathTraversal);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(IdValidationError::InvalidCharacters);
        }

        Ok(Self(name.to_string()))
    }

    /// Get the tool name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ToolName {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ToolName {
    type Error = IdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ToolName> for String {
    fn from(name: ToolName) -> Self {
        name.0
    }
}

impl AsRef<str> for ToolName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `ToolName` be queried with a plain `&str`.
impl Borrow<str> for ToolName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
