use std::io::{self, Read};
use std::sync::Arc;

use crate::domain::Metadata;
use crate::error::{Result, TarfsError};
use crate::index::inmem::{Node, TarIndex};
use crate::policy::Policy;
use crate::read::dir::DirHandle;
use crate::read::entry::DirEntry;
use crate::read::file::FileHandle;
use crate::section::Section;
use crate::source::ReadAt;
use crate::stats::Stats;
use crate::util::path::normalize;
use crate::vfs::{Close, File, ReadDir, Stat};

/// Read-only filesystem over a tar archive.
///
/// Indexing happens once in the constructor. Every `open` hands out an
/// independent handle with its own section and decoder cursor.
pub struct TarFs<S: ?Sized> {
    src: Arc<S>,
    index: TarIndex,
}

impl<S: ReadAt + ?Sized> TarFs<S> {
    pub fn new(src: Arc<S>) -> Result<Self> {
        Self::with_policy(src, &Policy::default())
    }

    pub fn with_policy(src: Arc<S>, policy: &Policy) -> Result<Self> {
        let index = TarIndex::build(&src, policy)?;
        Ok(Self { src, index })
    }

    pub fn open(&self, path: &str) -> Result<Handle<S>> {
        let node = self.node(path)?;
        if node.header.is_dir() {
            Ok(Handle::Dir(Self::dir_handle(node)))
        } else {
            Ok(Handle::File(self.file_handle(path, node)?))
        }
    }

    pub fn open_file(&self, path: &str) -> Result<FileHandle<S>> {
        let node = self.node(path)?;
        if node.header.is_dir() {
            return Err(TarfsError::IsADirectory(path.to_string()));
        }
        self.file_handle(path, node)
    }

    pub fn open_dir(&self, path: &str) -> Result<DirHandle> {
        let node = self.node(path)?;
        if !node.header.is_dir() {
            return Err(TarfsError::NotADirectory(path.to_string()));
        }
        Ok(Self::dir_handle(node))
    }

    pub fn stat(&self, path: &str) -> Result<Metadata> {
        Ok(self.node(path)?.header.metadata())
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.open_dir(path)?.read_entries(None)
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut f = self.open_file(path)?;
        let mut out = Vec::with_capacity(f.len().min(1 << 20) as usize);
        f.read_to_end(&mut out)?;
        Ok(out)
    }

    pub fn index(&self) -> &TarIndex {
        &self.index
    }

    pub fn stats(&self) -> &Stats {
        self.index.stats()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.src
    }

    fn node(&self, path: &str) -> Result<&Node> {
        let key = normalize(path).ok_or_else(|| TarfsError::InvalidPath(path.to_string()))?;
        self.index
            .get(&key)
            .ok_or_else(|| TarfsError::NotFound(path.to_string()))
    }

    fn file_handle(&self, path: &str, node: &Node) -> Result<FileHandle<S>> {
        let span = node
            .span
            .ok_or_else(|| TarfsError::format(format!("{path}: entry has no archive data")))?;
        let view = Section::new(Arc::clone(&self.src), span.start, span.len);
        FileHandle::open(Arc::clone(&node.header), view)
    }

    fn dir_handle(node: &Node) -> DirHandle {
        DirHandle::new(Arc::clone(&node.header), Arc::clone(&node.children))
    }
}

/// Whatever `open` found at a path.
pub enum Handle<S: ?Sized> {
    File(FileHandle<S>),
    Dir(DirHandle),
}

impl<S: ReadAt + ?Sized> Handle<S> {
    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Dir(_))
    }

    pub fn into_file(self) -> Option<FileHandle<S>> {
        match self {
            Handle::File(f) => Some(f),
            Handle::Dir(_) => None,
        }
    }

    pub fn into_dir(self) -> Option<DirHandle> {
        match self {
            Handle::Dir(d) => Some(d),
            Handle::File(_) => None,
        }
    }
}

impl<S: ReadAt + ?Sized> Read for Handle<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Handle::File(f) => f.read(buf),
            Handle::Dir(d) => d.read(buf),
        }
    }
}

impl<S: ReadAt + ?Sized> Stat for Handle<S> {
    fn stat(&self) -> Result<Metadata> {
        match self {
            Handle::File(f) => f.stat(),
            Handle::Dir(d) => d.stat(),
        }
    }
}

impl<S: ReadAt + ?Sized> Close for Handle<S> {
    fn close(self) -> Result<()> {
        match self {
            Handle::File(f) => f.close(),
            Handle::Dir(d) => d.close(),
        }
    }
}

impl<S: ReadAt + ?Sized> File for Handle<S> {}
