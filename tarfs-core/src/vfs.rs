//! Capability traits for virtual filesystem handles.
//!
//! Byte access uses `std::io::Read` and `std::io::Seek`. The traits here
//! cover the rest of the contract: [`Stat`], [`Close`] and [`ReadDir`].
//! [`File`] and [`SeekableFile`] name the combinations handle types offer.

use std::io::{Read, Seek};

use crate::domain::Metadata;
use crate::error::{Result, TarfsError};
use crate::read::entry::DirEntry;

pub trait Stat {
    fn stat(&self) -> Result<Metadata>;
}

pub trait Close {
    /// Releases the handle. Archive handles hold no OS resources, so this
    /// never fails for them; it consumes the handle so it cannot be reused.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

pub trait ReadDir {
    /// Returns the next page of directory entries in name order.
    ///
    /// `None` drains everything left and yields an empty vec once the
    /// listing is exhausted. `Some(n)` yields up to `n` entries, and
    /// [`TarfsError::EndOfListing`] once nothing remains.
    fn read_entries(&mut self, limit: Option<usize>) -> Result<Vec<DirEntry>>;
}

/// Anything that can be opened: readable, stat-able, closable.
pub trait File: Read + Stat + Close {}

/// A [`File`] that also supports random access.
pub trait SeekableFile: File + Seek {}

/// How to interpret a seek offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    pub const SEEK_SET: i32 = 0;
    pub const SEEK_CUR: i32 = 1;
    pub const SEEK_END: i32 = 2;
}

impl TryFrom<i32> for Whence {
    type Error = TarfsError;

    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            Self::SEEK_SET => Ok(Whence::Start),
            Self::SEEK_CUR => Ok(Whence::Current),
            Self::SEEK_END => Ok(Whence::End),
            other => Err(TarfsError::InvalidSeekWhence(other)),
        }
    }
}
