use time::OffsetDateTime;

use crate::domain::{FileMode, FileType, Metadata};
use crate::error::{Result, TarfsError};
use crate::util::path::base_name;

pub const BLOCK_LEN: usize = 512;

pub const MAGIC_USTAR: &[u8; 6] = b"ustar\0";
pub const MAGIC_GNU: &[u8; 6] = b"ustar ";

// typeflag values that carry data for the following header
pub const TYPE_GNU_LONGNAME: u8 = b'L';
pub const TYPE_GNU_LONGLINK: u8 = b'K';
pub const TYPE_PAX: u8 = b'x';
pub const TYPE_PAX_GLOBAL: u8 = b'g';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Link,
    Symlink,
    Char,
    Block,
    Directory,
    Fifo,
    Other(u8),
}

impl EntryKind {
    pub fn from_typeflag(flag: u8) -> Self {
        match flag {
            b'0' | b'\0' | b'7' => EntryKind::Regular,
            b'1' => EntryKind::Link,
            b'2' => EntryKind::Symlink,
            b'3' => EntryKind::Char,
            b'4' => EntryKind::Block,
            b'5' => EntryKind::Directory,
            b'6' => EntryKind::Fifo,
            other => EntryKind::Other(other),
        }
    }

    pub fn file_type(self) -> FileType {
        match self {
            EntryKind::Regular | EntryKind::Link => FileType::Regular,
            EntryKind::Symlink => FileType::Symlink,
            EntryKind::Char => FileType::CharDevice,
            EntryKind::Block => FileType::BlockDevice,
            EntryKind::Directory => FileType::Directory,
            EntryKind::Fifo => FileType::Fifo,
            EntryKind::Other(_) => FileType::Unknown,
        }
    }
}

/// Metadata of one archive entry, after extension headers are applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub path: String,
    pub link_name: String,
    pub kind: EntryKind,
    /// Permission bits including setuid/setgid/sticky.
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    pub uname: String,
    pub gname: String,
    pub size: u64,
    pub mtime: OffsetDateTime,
}

impl Header {
    pub fn new(path: impl Into<String>, kind: EntryKind, size: u64) -> Self {
        let mode = match kind {
            EntryKind::Directory => 0o755,
            _ => 0o644,
        };
        Self {
            path: path.into(),
            link_name: String::new(),
            kind,
            mode,
            uid: 0,
            gid: 0,
            uname: String::new(),
            gname: String::new(),
            size,
            mtime: OffsetDateTime::UNIX_EPOCH,
        }
    }

    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn file_mode(&self) -> FileMode {
        FileMode::new(self.kind.file_type(), self.mode)
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            name: self.base_name().to_string(),
            size: self.size,
            mode: self.file_mode(),
            mtime: self.mtime,
            link_target: match self.kind {
                EntryKind::Symlink | EntryKind::Link => Some(self.link_name.clone()),
                _ => None,
            },
        }
    }
}

/// Parses one header block. `None` means an all-zero block (end of archive).
/// The raw typeflag is returned alongside so the decoder can dispatch on
/// extension records.
pub(crate) fn parse_block(block: &[u8; BLOCK_LEN]) -> Result<Option<(Header, u8)>> {
    if block.iter().all(|&b| b == 0) {
        return Ok(None);
    }
    verify_checksum(block)?;

    let flag = block[156];
    let magic = &block[257..263];
    let mut path = cstr(&block[0..100]);
    let (uname, gname) = if magic == MAGIC_USTAR || magic == MAGIC_GNU {
        (cstr(&block[265..297]), cstr(&block[297..329]))
    } else {
        (String::new(), String::new())
    };
    if magic == MAGIC_USTAR {
        let prefix = cstr(&block[345..500]);
        if !prefix.is_empty() {
            path = format!("{prefix}/{path}");
        }
    }

    let size = parse_numeric(&block[124..136])?;
    let size = u64::try_from(size).map_err(|_| TarfsError::format("negative entry size"))?;
    let mtime = unix_time(parse_numeric(&block[136..148])?)?;

    let mut kind = EntryKind::from_typeflag(flag);
    // v7 archives mark directories only with a trailing slash
    if kind == EntryKind::Regular && flag != b'7' && path.ends_with('/') {
        kind = EntryKind::Directory;
    }

    let header = Header {
        path,
        link_name: cstr(&block[157..257]),
        kind,
        mode: (parse_numeric(&block[100..108])? as u32) & 0o7777,
        uid: parse_numeric(&block[108..116])?.max(0) as u64,
        gid: parse_numeric(&block[116..124])?.max(0) as u64,
        uname,
        gname,
        size,
        mtime,
    };
    Ok(Some((header, flag)))
}

fn verify_checksum(block: &[u8; BLOCK_LEN]) -> Result<()> {
    let stored = parse_octal(&block[148..156])?;
    let mut unsigned = 0i64;
    let mut signed = 0i64;
    for (i, &b) in block.iter().enumerate() {
        let b = if (148..156).contains(&i) { b' ' } else { b };
        unsigned += i64::from(b);
        signed += i64::from(b as i8);
    }
    if stored != unsigned && stored != signed {
        return Err(TarfsError::format(format!(
            "header checksum mismatch: stored {stored}, computed {unsigned}"
        )));
    }
    Ok(())
}

/// Octal, or GNU base-256 when the high bit of the first byte is set.
pub(crate) fn parse_numeric(field: &[u8]) -> Result<i64> {
    match field.first() {
        Some(&b) if b & 0x80 != 0 => parse_base256(field),
        _ => parse_octal(field),
    }
}

fn parse_base256(field: &[u8]) -> Result<i64> {
    // two's complement: negative values are stored inverted
    let inv = if field[0] & 0x40 != 0 { 0xff } else { 0 };
    let mut v: u64 = 0;
    for (i, &b) in field.iter().enumerate() {
        let mut c = b ^ inv;
        if i == 0 {
            c &= 0x7f;
        }
        if v >> 56 != 0 {
            return Err(TarfsError::format("base-256 field overflows i64"));
        }
        v = (v << 8) | u64::from(c);
    }
    if v >> 63 != 0 {
        return Err(TarfsError::format("base-256 field overflows i64"));
    }
    let v = v as i64;
    Ok(if inv == 0xff { !v } else { v })
}

fn parse_octal(field: &[u8]) -> Result<i64> {
    let s = field
        .iter()
        .skip_while(|&&b| b == b' ' || b == 0)
        .take_while(|&&b| b != b' ' && b != 0)
        .copied()
        .collect::<Vec<u8>>();
    if s.is_empty() {
        return Ok(0);
    }
    let s = std::str::from_utf8(&s).map_err(|_| TarfsError::format("non-ascii numeric field"))?;
    i64::from_str_radix(s, 8).map_err(|e| TarfsError::format(format!("bad octal field {s:?}: {e}")))
}

pub(crate) fn unix_time(secs: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| TarfsError::format(format!("mtime out of range: {e}")))
}

/// NUL-terminated field, lossily decoded.
pub(crate) fn cstr(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Bytes of zero padding after `size` bytes of entry data.
pub fn padding(size: u64) -> u64 {
    let rem = size % BLOCK_LEN as u64;
    if rem == 0 { 0 } else { BLOCK_LEN as u64 - rem }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(name: &str, flag: u8, size: u64) -> [u8; BLOCK_LEN] {
        let mut b = [0u8; BLOCK_LEN];
        b[..name.len()].copy_from_slice(name.as_bytes());
        b[100..108].copy_from_slice(b"0000644\0");
        b[108..116].copy_from_slice(b"0001750\0");
        b[116..124].copy_from_slice(b"0001750\0");
        b[124..136].copy_from_slice(format!("{size:011o}\0").as_bytes());
        b[136..148].copy_from_slice(b"14500000000\0");
        b[156] = flag;
        b[257..263].copy_from_slice(MAGIC_USTAR);
        b[263..265].copy_from_slice(b"00");
        b[265..270].copy_from_slice(b"alice");
        seal(&mut b);
        b
    }

    fn seal(b: &mut [u8; BLOCK_LEN]) {
        b[148..156].fill(b' ');
        let sum: u32 = b.iter().map(|&x| u32::from(x)).sum();
        b[148..156].copy_from_slice(format!("{sum:06o}\0 ").as_bytes());
    }

    #[test]
    fn parses_ustar_fields() {
        let (h, flag) = parse_block(&block_with("dir/file.txt", b'0', 10))
            .unwrap()
            .unwrap();
        assert_eq!(flag, b'0');
        assert_eq!(h.path, "dir/file.txt");
        assert_eq!(h.kind, EntryKind::Regular);
        assert_eq!(h.size, 10);
        assert_eq!(h.mode, 0o644);
        assert_eq!(h.uid, 1000);
        assert_eq!(h.uname, "alice");
        assert_eq!(h.mtime.unix_timestamp(), 0o14500000000);
        assert_eq!(h.base_name(), "file.txt");
    }

    #[test]
    fn joins_ustar_prefix() {
        let mut b = block_with("leaf.rs", b'0', 0);
        b[345..352].copy_from_slice(b"a/b/src");
        seal(&mut b);
        let (h, _) = parse_block(&b).unwrap().unwrap();
        assert_eq!(h.path, "a/b/src/leaf.rs");
    }

    #[test]
    fn zero_block_ends_archive() {
        assert!(parse_block(&[0u8; BLOCK_LEN]).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut b = block_with("x", b'0', 1);
        b[0] = b'y';
        assert!(matches!(parse_block(&b), Err(TarfsError::Format(_))));
    }

    #[test]
    fn v7_trailing_slash_is_directory() {
        let (h, _) = parse_block(&block_with("old/", b'\0', 0)).unwrap().unwrap();
        assert_eq!(h.kind, EntryKind::Directory);
        assert!(h.file_mode().is_dir());
    }

    #[test]
    fn numeric_fields() {
        assert_eq!(parse_numeric(b"  0017 \0").unwrap(), 0o17);
        assert_eq!(parse_numeric(b"\0\0\0\0").unwrap(), 0);
        let mut big = [0u8; 12];
        big[0] = 0x80;
        big[4..].copy_from_slice(&(10u64 << 33).to_be_bytes());
        assert_eq!(parse_numeric(&big).unwrap(), 10 << 33);
        assert_eq!(parse_numeric(&[0xff; 8]).unwrap(), -1);
        assert!(parse_numeric(b"0009").is_err());
    }

    #[test]
    fn padding_rounds_to_block() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 511);
        assert_eq!(padding(512), 0);
        assert_eq!(padding(513), 511);
    }
}
