use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::domain::{FileMode, Metadata};
use crate::error::Result;
use crate::tar::header::Header;

/// Directory-listing view of one archive header.
#[derive(Clone)]
pub struct DirEntry {
    header: Arc<Header>,
}

impl DirEntry {
    pub fn new(header: Arc<Header>) -> Self {
        Self { header }
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.header.base_name()
    }

    pub fn is_dir(&self) -> bool {
        self.header.is_dir()
    }

    /// Type bits of the entry's mode, permissions cleared.
    pub fn file_type(&self) -> FileMode {
        self.header.file_mode().type_bits()
    }

    pub fn info(&self) -> Result<Metadata> {
        Ok(self.header.metadata())
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// Byte-wise ascending order of base names.
    pub fn cmp_by_name(&self, other: &Self) -> Ordering {
        self.name().as_bytes().cmp(other.name().as_bytes())
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntry")
            .field("name", &self.name())
            .field("mode", &self.header.file_mode())
            .finish()
    }
}

pub fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(DirEntry::cmp_by_name);
}

pub fn is_sorted(entries: &[DirEntry]) -> bool {
    entries
        .windows(2)
        .all(|w| w[0].cmp_by_name(&w[1]) == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileType;
    use crate::tar::header::EntryKind;

    fn entry(path: &str, kind: EntryKind) -> DirEntry {
        DirEntry::new(Arc::new(Header::new(path, kind, 3)))
    }

    #[test]
    fn orders_by_bytes_not_case() {
        let mut v = vec![
            entry("d/b", EntryKind::Regular),
            entry("d/A", EntryKind::Regular),
            entry("d/c", EntryKind::Directory),
        ];
        sort_entries(&mut v);
        let names: Vec<_> = v.iter().map(DirEntry::name).collect();
        assert_eq!(names, ["A", "b", "c"]);
        assert!(is_sorted(&v));
    }

    #[test]
    fn duplicate_names_are_not_strictly_sorted() {
        let v = vec![entry("x/a", EntryKind::Regular), entry("y/a", EntryKind::Regular)];
        assert!(!is_sorted(&v));
    }

    #[test]
    fn projects_header() {
        let e = entry("top/sub/", EntryKind::Directory);
        assert_eq!(e.name(), "sub");
        assert!(e.is_dir());
        assert_eq!(e.file_type().bits(), FileMode::S_IFDIR);
        let info = e.info().unwrap();
        assert_eq!(info.name, "sub");
        assert_eq!(info.file_type(), FileType::Directory);
        assert_eq!(info.mode.perm(), 0o755);
    }
}
