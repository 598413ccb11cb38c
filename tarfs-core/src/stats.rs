use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub files: u64,
    pub dirs: u64,
    pub symlinks: u64,
    pub others: u64,
    /// Directories with no header of their own in the archive.
    pub implicit_dirs: u64,
    /// Entries dropped during indexing: unsafe paths, non-directory roots
    /// and anything below a non-directory parent. Dropped entries cannot be
    /// opened.
    pub skipped: u64,
    pub logical_bytes: u64,
    pub archive_bytes: u64,
}
