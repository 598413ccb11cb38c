use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::source::ReadAt;

/// Fixed window `[base, base + size)` over a shared byte source.
///
/// Offsets are relative to `base`. The window never grows or shrinks; a
/// position beyond it is legal and simply reads as end-of-stream.
pub struct Section<S: ?Sized> {
    src: Arc<S>,
    base: u64,
    size: u64,
    off: u64,
}

impl<S: ReadAt + ?Sized> Section<S> {
    pub fn new(src: Arc<S>, base: u64, size: u64) -> Self {
        Self {
            src,
            base,
            size,
            off: 0,
        }
    }

    /// Window covering the whole source.
    pub fn whole(src: Arc<S>) -> io::Result<Self> {
        let size = src.len()?;
        Ok(Self::new(src, 0, size))
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn position(&self) -> u64 {
        self.off
    }

    pub fn source(&self) -> &Arc<S> {
        &self.src
    }
}

impl<S: ReadAt + ?Sized> Read for Section<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.off >= self.size || buf.is_empty() {
            return Ok(0);
        }
        let cap = (self.size - self.off).min(buf.len() as u64) as usize;
        let n = self.src.read_at(&mut buf[..cap], self.base + self.off)?;
        self.off += n as u64;
        Ok(n)
    }
}

impl<S: ReadAt + ?Sized> Seek for Section<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let next = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(d) => self.off.checked_add_signed(d),
            SeekFrom::End(d) => self.size.checked_add_signed(d),
        };
        let next = next.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        self.off = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(base: u64, size: u64) -> Section<Vec<u8>> {
        Section::new(Arc::new(b"0123456789abcdef".to_vec()), base, size)
    }

    #[test]
    fn reads_stay_inside_window() {
        let mut s = section(4, 6);
        let mut out = String::new();
        s.read_to_string(&mut out).unwrap();
        assert_eq!(out, "456789");
        assert_eq!(s.position(), 6);
    }

    #[test]
    fn seek_is_relative_to_base() {
        let mut s = section(10, 6);
        assert_eq!(s.seek(SeekFrom::End(-2)).unwrap(), 4);
        let mut buf = [0u8; 8];
        let n = s.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ef");

        s.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(s.seek(SeekFrom::Current(2)).unwrap(), 3);
        let n = s.read(&mut buf[..1]).unwrap();
        assert_eq!(&buf[..n], b"d");
    }

    #[test]
    fn past_end_reads_nothing() {
        let mut s = section(0, 4);
        s.seek(SeekFrom::Start(100)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(s.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn negative_seek_is_rejected() {
        let mut s = section(0, 4);
        let err = s.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn window_larger_than_source_ends_early() {
        let mut s = section(12, 100);
        let mut out = Vec::new();
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"cdef");
    }
}
