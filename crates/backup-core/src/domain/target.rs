//! Drive targets — the unit of work Discovery fans out to DeltaWalker.

use serde::{Deserialize, Serialize};

use super::newtypes::DriveId;

/// The kind of drive a target represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveKind {
    /// A single user's personal drive.
    Personal,
    /// A shared team (SharePoint document library) drive.
    Team,
}

impl std::fmt::Display for DriveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveKind::Personal => write!(f, "personal"),
            DriveKind::Team => write!(f, "team"),
        }
    }
}

/// One drive within a source: a personal drive, or a team drive.
///
/// `id` is unique within a source; `path_prefix` is a stable, printable
/// string used to namespace objects in the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveTarget {
    /// Source-assigned identifier, unique within the source.
    pub id: DriveId,
    /// Human-readable name (owner's display name, or drive name).
    pub display_name: String,
    /// Personal or team.
    pub kind: DriveKind,
    /// Namespace prefix for this target's objects at the destination.
    pub path_prefix: String,
}

impl DriveTarget {
    /// Construct a new target.
    #[must_use]
    pub fn new(id: DriveId, display_name: String, kind: DriveKind, path_prefix: String) -> Self {
        Self {
            id,
            display_name,
            kind,
            path_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_kind_display() {
        assert_eq!(DriveKind::Personal.to_string(), "personal");
        assert_eq!(DriveKind::Team.to_string(), "team");
    }

    #[test]
    fn test_drive_kind_serializes_lowercase() {
        let json = serde_json::to_string(&DriveKind::Team).unwrap();
        assert_eq!(json, "\"team\"");
    }
}
