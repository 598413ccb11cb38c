use std::io::{self, Read};
use std::sync::Arc;

use crate::domain::Metadata;
use crate::error::{Result, TarfsError};
use crate::read::entry::{DirEntry, is_sorted};
use crate::tar::header::Header;
use crate::vfs::{Close, File, ReadDir, Stat};

/// Paginated listing over a directory's children.
///
/// The children are fixed at construction and must already be sorted by
/// name; the cursor only ever moves forward.
pub struct DirHandle {
    header: Arc<Header>,
    entries: Arc<[DirEntry]>,
    pos: usize,
}

impl DirHandle {
    pub fn new(header: Arc<Header>, entries: Arc<[DirEntry]>) -> Self {
        debug_assert!(is_sorted(&entries), "directory entries must be sorted by name");
        Self {
            header,
            entries,
            pos: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.entries.len() - self.pos
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }
}

impl ReadDir for DirHandle {
    fn read_entries(&mut self, limit: Option<usize>) -> Result<Vec<DirEntry>> {
        let rest = &self.entries[self.pos..];
        if rest.is_empty() {
            return match limit {
                None => Ok(Vec::new()),
                Some(_) => Err(TarfsError::EndOfListing),
            };
        }
        let take = limit.map_or(rest.len(), |n| n.min(rest.len()));
        let page = rest[..take].to_vec();
        self.pos += take;
        Ok(page)
    }
}

impl Read for DirHandle {
    /// Directories have no byte content.
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Stat for DirHandle {
    fn stat(&self) -> Result<Metadata> {
        Ok(self.header.metadata())
    }
}

impl Close for DirHandle {
    fn close(self) -> Result<()> {
        Ok(())
    }
}

impl File for DirHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::entry::sort_entries;
    use crate::tar::header::EntryKind;

    fn dir(names: &[&str]) -> DirHandle {
        let mut entries: Vec<DirEntry> = names
            .iter()
            .map(|n| DirEntry::new(Arc::new(Header::new(format!("d/{n}"), EntryKind::Regular, 0))))
            .collect();
        sort_entries(&mut entries);
        DirHandle::new(Arc::new(Header::new("d", EntryKind::Directory, 0)), entries.into())
    }

    fn names(v: &[DirEntry]) -> Vec<&str> {
        v.iter().map(DirEntry::name).collect()
    }

    #[test]
    fn read_all_then_empty() {
        let mut d = dir(&["b", "A", "c"]);
        let all = d.read_entries(None).unwrap();
        assert_eq!(names(&all), ["A", "b", "c"]);
        assert!(d.read_entries(None).unwrap().is_empty());
        assert!(d.read_entries(None).unwrap().is_empty());
    }

    #[test]
    fn pages_until_end_of_listing() {
        let mut d = dir(&["b", "A", "c"]);
        assert_eq!(names(&d.read_entries(Some(2)).unwrap()), ["A", "b"]);
        assert_eq!(names(&d.read_entries(Some(2)).unwrap()), ["c"]);
        assert!(d.read_entries(Some(2)).unwrap_err().is_end_of_listing());
        assert!(d.read_entries(Some(2)).unwrap_err().is_end_of_listing());
        assert!(d.read_entries(None).unwrap().is_empty());
        assert_eq!(d.remaining(), 0);
    }

    #[test]
    fn zero_sized_page_does_not_advance() {
        let mut d = dir(&["x"]);
        assert!(d.read_entries(Some(0)).unwrap().is_empty());
        assert_eq!(d.remaining(), 1);
        assert_eq!(names(&d.read_entries(Some(5)).unwrap()), ["x"]);
    }

    #[test]
    fn empty_directory() {
        let mut d = dir(&[]);
        assert!(d.read_entries(None).unwrap().is_empty());
        assert!(matches!(
            d.read_entries(Some(1)),
            Err(TarfsError::EndOfListing)
        ));
    }

    #[test]
    fn reads_no_bytes_and_stats() {
        let mut d = dir(&["a"]);
        let mut buf = [0u8; 4];
        assert_eq!(d.read(&mut buf).unwrap(), 0);
        let st = d.stat().unwrap();
        assert!(st.is_dir());
        assert_eq!(st.name, "d");
        d.close().unwrap();
    }
}
