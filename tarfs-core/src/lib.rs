#![forbid(unsafe_code)]

pub mod error;
pub mod policy;
pub mod stats;

pub mod util {
    pub mod discard;
    pub mod path;
}

pub mod codec;
pub mod domain;
pub mod section;
pub mod source;
pub mod tar;
pub mod vfs;

pub mod index {
    pub mod inmem;
}

pub mod read {
    pub mod dir;
    pub mod entry;
    pub mod file;
}

pub mod fs;
pub mod repo;
pub mod repo_factory;
pub mod repo_fs;
pub mod walk;

// Re-exports: stable API surface
pub use domain::{FileMode, FileType, Metadata};
pub use error::{Result, TarfsError};
pub use fs::{Handle, TarFs};
pub use policy::Policy;
pub use read::dir::DirHandle;
pub use read::entry::DirEntry;
pub use read::file::FileHandle;
pub use source::ReadAt;
pub use vfs::{Close, File, ReadDir, SeekableFile, Stat, Whence};
pub use walk::walk;
