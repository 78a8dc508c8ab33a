//! Store access modes.

use serde::{Deserialize, Serialize};

/// How the store exposes its backing objects to this process.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageMode {
    /// Absolute paths of stored objects are visible
    #[display("legacy")]
    Legacy,
    /// Sandboxed access: absolute paths are withheld
    #[default]
    #[display("scoped")]
    Scoped,
}

impl StorageMode {
    /// Whether absolute path hints are reported for records.
    pub fn exposes_paths(&self) -> bool {
        matches!(self, StorageMode::Legacy)
    }
}
