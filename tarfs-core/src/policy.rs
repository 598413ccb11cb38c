use serde::{Deserialize, Serialize};

/// Limits applied while indexing an archive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub max_entries: Option<u64>,
    pub max_entry_size: Option<u64>,
    /// Fail on paths escaping the root instead of skipping them.
    pub reject_unsafe_paths: bool,
}
