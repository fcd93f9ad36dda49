//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// A drive identifier as assigned by the source (personal drive or team
/// drive). Opaque but non-empty; source IDs are typically alphanumeric
/// with a handful of punctuation characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriveId(String);

impl DriveId {
    /// Create a new `DriveId`.
    ///
    /// # Errors
    /// Returns an error if the id is empty or contains characters outside
    /// the alphanumeric + `!-_` set used by the source.
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidDriveId(
                "drive id cannot be empty".to_string(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '!' || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidDriveId(format!(
                "drive id contains invalid characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DriveId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DriveId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for DriveId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DriveId> for String {
    fn from(id: DriveId) -> Self {
        id.0
    }
}

/// An item identifier within a drive, as assigned by the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Create a new `ItemId`.
    ///
    /// # Errors
    /// Returns an error if the id is empty or contains characters outside
    /// the alphanumeric + `!-_` set used by the source.
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidItemId(
                "item id cannot be empty".to_string(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '!' || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidItemId(format!(
                "item id contains invalid characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ItemId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// A POSIX-style relative path rooted at a target's `path_prefix`.
///
/// Invariants: never starts with `/`, never contains a `..` segment, never
/// contains an empty segment (no `//`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullPath(String);

impl FullPath {
    /// Create a new `FullPath`.
    ///
    /// # Errors
    /// Returns an error if the path starts with `/`, contains a `..`
    /// segment, or contains an empty segment.
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "full path must not start with '/': {path}"
            )));
        }
        if path.split('/').any(|seg| seg == "..") {
            return Err(DomainError::InvalidPath(format!(
                "full path contains a traversal segment: {path}"
            )));
        }
        if path.split('/').any(str::is_empty) {
            return Err(DomainError::InvalidPath(format!(
                "full path contains an empty segment: {path}"
            )));
        }
        Ok(Self(path))
    }

    /// Build a full path by joining a path prefix, a server-reported parent
    /// path (already stripped of the source's root sentinel), and a file
    /// name.
    ///
    /// # Errors
    /// Returns an error if the resulting path is invalid.
    pub fn build(path_prefix: &str, parent_path: &str, name: &str) -> Result<Self, DomainError> {
        let mut parts: Vec<&str> = Vec::new();
        if !path_prefix.is_empty() {
            parts.push(path_prefix.trim_matches('/'));
        }
        let parent_trimmed = parent_path.trim_matches('/');
        if !parent_trimmed.is_empty() {
            parts.push(parent_trimmed);
        }
        parts.push(name);
        Self::new(parts.join("/"))
    }

    /// Get the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FullPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FullPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for FullPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FullPath> for String {
    fn from(path: FullPath) -> Self {
        path.0
    }
}

/// An opaque delta token (or full delta/next link URL) returned by the
/// source. We don't validate its contents, only that it's non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeltaToken(String);

impl DeltaToken {
    /// Create a new `DeltaToken`.
    ///
    /// # Errors
    /// Returns an error if the token is empty.
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidDeltaToken(
                "delta token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeltaToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeltaToken {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for DeltaToken {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DeltaToken> for String {
    fn from(token: DeltaToken) -> Self {
        token.0
    }
}
