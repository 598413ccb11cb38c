// tarfs_core/src/domain.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileType {
    /// `S_IFMT` bits for this type; `Unknown` has none.
    pub fn type_bits(self) -> u32 {
        match self {
            FileType::Regular => FileMode::S_IFREG,
            FileType::Directory => FileMode::S_IFDIR,
            FileType::Symlink => FileMode::S_IFLNK,
            FileType::CharDevice => FileMode::S_IFCHR,
            FileType::BlockDevice => FileMode::S_IFBLK,
            FileType::Fifo => FileMode::S_IFIFO,
            FileType::Socket => FileMode::S_IFSOCK,
            FileType::Unknown => 0,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & FileMode::S_IFMT {
            FileMode::S_IFREG => FileType::Regular,
            FileMode::S_IFDIR => FileType::Directory,
            FileMode::S_IFLNK => FileType::Symlink,
            FileMode::S_IFCHR => FileType::CharDevice,
            FileMode::S_IFBLK => FileType::BlockDevice,
            FileMode::S_IFIFO => FileType::Fifo,
            FileMode::S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }
}

/// Unix-style mode word: `S_IFMT` type bits plus permission bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    pub const S_IFMT: u32 = 0o170000;
    pub const S_IFSOCK: u32 = 0o140000;
    pub const S_IFLNK: u32 = 0o120000;
    pub const S_IFREG: u32 = 0o100000;
    pub const S_IFBLK: u32 = 0o060000;
    pub const S_IFDIR: u32 = 0o040000;
    pub const S_IFCHR: u32 = 0o020000;
    pub const S_IFIFO: u32 = 0o010000;
    pub const PERM_MASK: u32 = 0o7777;

    pub fn new(kind: FileType, perm: u32) -> Self {
        Self(kind.type_bits() | (perm & Self::PERM_MASK))
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Only the type bits, permissions cleared.
    pub fn type_bits(self) -> FileMode {
        Self(self.0 & Self::S_IFMT)
    }

    pub fn perm(self) -> u32 {
        self.0 & Self::PERM_MASK
    }

    pub fn file_type(self) -> FileType {
        FileType::from_bits(self.0)
    }

    pub fn is_dir(self) -> bool {
        self.file_type() == FileType::Directory
    }

    pub fn is_regular(self) -> bool {
        self.file_type() == FileType::Regular
    }

    pub fn is_symlink(self) -> bool {
        self.file_type() == FileType::Symlink
    }
}

impl fmt::Display for FileMode {
    /// `ls -l` notation, e.g. `drwxr-xr-x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.file_type() {
            FileType::Regular => '-',
            FileType::Directory => 'd',
            FileType::Symlink => 'l',
            FileType::CharDevice => 'c',
            FileType::BlockDevice => 'b',
            FileType::Fifo => 'p',
            FileType::Socket => 's',
            FileType::Unknown => '?',
        };
        let p = self.perm();
        let bit = |mask: u32, c: char| if p & mask != 0 { c } else { '-' };
        let exec = |x: u32, special: u32, set: char, unset: char| match (p & x != 0, p & special != 0) {
            (true, true) => set,
            (false, true) => unset,
            (true, false) => 'x',
            (false, false) => '-',
        };
        let s: String = [
            kind,
            bit(0o400, 'r'),
            bit(0o200, 'w'),
            exec(0o100, 0o4000, 's', 'S'),
            bit(0o040, 'r'),
            bit(0o020, 'w'),
            exec(0o010, 0o2000, 's', 'S'),
            bit(0o004, 'r'),
            bit(0o002, 'w'),
            exec(0o001, 0o1000, 't', 'T'),
        ]
        .into_iter()
        .collect();
        f.pad(&s)
    }
}

/// What `stat` reports for an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Base name, not the full path.
    pub name: String,
    pub size: u64,
    pub mode: FileMode,
    #[serde(with = "time::serde::rfc3339")]
    pub mtime: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn file_type(&self) -> FileType {
        self.mode.file_type()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FileRow {
    pub path: String,
    pub size: u64,
    pub mode: FileMode,
    #[serde(with = "time::serde::rfc3339")]
    pub mtime: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_splits_type_and_perm() {
        let m = FileMode::new(FileType::Directory, 0o40755);
        assert_eq!(m.bits(), 0o040755);
        assert_eq!(m.perm(), 0o755);
        assert_eq!(m.type_bits().bits(), FileMode::S_IFDIR);
        assert!(m.is_dir());
        assert!(!m.is_regular());
    }

    #[test]
    fn unknown_type_has_no_type_bits() {
        let m = FileMode::new(FileType::Unknown, 0o644);
        assert_eq!(m.type_bits().bits(), 0);
        assert_eq!(m.file_type(), FileType::Unknown);
    }

    #[test]
    fn ls_style_display() {
        assert_eq!(FileMode::new(FileType::Directory, 0o755).to_string(), "drwxr-xr-x");
        assert_eq!(FileMode::new(FileType::Regular, 0o640).to_string(), "-rw-r-----");
        assert_eq!(FileMode::new(FileType::Symlink, 0o777).to_string(), "lrwxrwxrwx");
        assert_eq!(FileMode::new(FileType::Regular, 0o4755).to_string(), "-rwsr-xr-x");
        assert_eq!(FileMode::new(FileType::Directory, 0o1777).to_string(), "drwxrwxrwt");
        assert_eq!(FileMode::new(FileType::Regular, 0o2644).to_string(), "-rw-r-Sr--");
    }
}
