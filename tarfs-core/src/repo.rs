// tarfs_core/src/repo.rs
use crate::domain::{FileRow, Metadata};
use crate::error::Result;
use crate::policy::Policy;
use crate::read::dir::DirHandle;
use crate::repo_factory::Backend;
use crate::stats::Stats;
use crate::vfs::SeekableFile;
use std::io::Read;

#[derive(Clone, Debug, Default)]
pub struct OpenParams {
    pub archive_path: std::path::PathBuf,
    pub backend: Backend,
    pub policy: Policy,
}

/// Object-safe view of an opened archive, independent of its byte source.
pub trait ArchiveRepo: Send + Sync {
    /// Every indexed path in depth-first name order, root excluded.
    fn list_files(&self) -> Result<Vec<FileRow>>;

    fn stat(&self, path: &str) -> Result<Metadata>;

    fn open_dir(&self, path: &str) -> Result<DirHandle>;

    fn open_reader(&self, path: &str) -> Result<Box<dyn SeekableFile + Send + '_>>;

    /// `len` bytes of `path` starting at `start`, fewer if the entry ends
    /// first. `start` past the end is an error.
    fn open_range(&self, path: &str, start: u64, len: u64) -> Result<Box<dyn Read + Send + '_>>;

    fn stats(&self) -> Stats;
}
