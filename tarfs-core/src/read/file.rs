use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tracing::trace;

use crate::domain::Metadata;
use crate::error::{Result, TarfsError};
use crate::section::Section;
use crate::source::ReadAt;
use crate::tar::decoder::Decoder;
use crate::tar::header::Header;
use crate::util::discard::discard;
use crate::vfs::{Close, File, SeekableFile, Stat, Whence};

/// Seekable reader over one entry's data.
///
/// The decoder underneath only moves forward. Forward relative seeks skip
/// bytes on the live cursor; every other seek rewinds the section, locates
/// the entry again and skips to the target, so it costs O(target).
pub struct FileHandle<S: ?Sized> {
    header: Arc<Header>,
    cursor: Decoder<Section<S>>,
    pos: u64,
    restarts: u64,
}

impl<S: ReadAt + ?Sized> FileHandle<S> {
    /// `view` must start at the entry's first header block and be
    /// positioned at its own offset zero.
    pub fn open(header: Arc<Header>, view: Section<S>) -> Result<Self> {
        let mut cursor = Decoder::new(view);
        locate(&mut cursor)?;
        Ok(Self {
            header,
            cursor,
            pos: 0,
            restarts: 0,
        })
    }

    /// Logical offset into the entry's data.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> u64 {
        self.header.size
    }

    pub fn is_empty(&self) -> bool {
        self.header.size == 0
    }

    /// How many times the cursor has been re-derived from the start.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// Repositions and returns the new offset.
    ///
    /// On [`TarfsError::ShortDiscard`] the handle stays where the skip
    /// stopped, i.e. at the end of the entry data.
    pub fn seek_to(&mut self, whence: Whence, offset: i64) -> Result<u64> {
        let target = match whence {
            Whence::Start => i128::from(offset),
            Whence::Current if offset >= 0 => {
                trace!(path = %self.header.path, from = self.pos, skip = offset, "forward seek");
                discard(self, offset as u64)?;
                return Ok(self.pos);
            }
            Whence::Current => i128::from(self.pos) + i128::from(offset),
            Whence::End => i128::from(self.header.size) + i128::from(offset),
        };
        if target < 0 {
            return Err(TarfsError::NegativePosition(
                i64::try_from(target).unwrap_or(i64::MIN),
            ));
        }
        let Ok(target) = u64::try_from(target) else {
            // past any entry; the cursor is left where it is
            return Err(TarfsError::ShortDiscard {
                requested: u64::MAX,
                discarded: self.pos,
            });
        };
        self.seek_start(target)
    }

    /// Numeric whence (`0` start, `1` current, `2` end).
    pub fn seek_whence(&mut self, offset: i64, whence: i32) -> Result<u64> {
        let whence = Whence::try_from(whence)?;
        self.seek_to(whence, offset)
    }

    /// Absolute seek; always re-derives the cursor.
    pub fn seek_start(&mut self, target: u64) -> Result<u64> {
        self.reopen()?;
        discard(self, target)?;
        Ok(self.pos)
    }

    fn reopen(&mut self) -> Result<()> {
        // rewinds the section to its own offset zero
        self.cursor.restart()?;
        locate(&mut self.cursor)?;
        self.pos = 0;
        self.restarts += 1;
        trace!(path = %self.header.path, restarts = self.restarts, "cursor restarted");
        Ok(())
    }
}

fn locate<S: ReadAt + ?Sized>(cursor: &mut Decoder<Section<S>>) -> Result<()> {
    match cursor.next_entry()? {
        Some(_) => Ok(()),
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no tar entry at the start of the section",
        )
        .into()),
    }
}

impl<S: ReadAt + ?Sized> Read for FileHandle<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.cursor.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: ReadAt + ?Sized> Seek for FileHandle<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let r = match pos {
            SeekFrom::Start(n) => self.seek_start(n),
            SeekFrom::Current(d) => self.seek_to(Whence::Current, d),
            SeekFrom::End(d) => self.seek_to(Whence::End, d),
        };
        r.map_err(io::Error::from)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}

impl<S: ReadAt + ?Sized> Stat for FileHandle<S> {
    fn stat(&self) -> Result<Metadata> {
        Ok(self.header.metadata())
    }
}

impl<S: ReadAt + ?Sized> Close for FileHandle<S> {
    fn close(self) -> Result<()> {
        Ok(())
    }
}

impl<S: ReadAt + ?Sized> File for FileHandle<S> {}
impl<S: ReadAt + ?Sized> SeekableFile for FileHandle<S> {}
