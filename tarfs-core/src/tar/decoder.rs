use std::io::{self, Read, Seek, SeekFrom};

use time::OffsetDateTime;
use tracing::trace;

use super::header::{
    BLOCK_LEN, Header, TYPE_GNU_LONGLINK, TYPE_GNU_LONGNAME, TYPE_PAX, TYPE_PAX_GLOBAL, cstr,
    padding, parse_block,
};
use crate::error::{Result, TarfsError};
use crate::util::discard::discard;

/// Upper bound for GNU long-name and PAX record payloads.
pub const MAX_EXT_LEN: u64 = 1 << 20;

/// Forward-only tar reader.
///
/// [`next_entry`](Decoder::next_entry) locates the next entry; [`Read`]
/// then yields exactly that entry's data. There is no way back except
/// [`restart`](Decoder::restart), which begins again from offset zero.
pub struct Decoder<R> {
    inner: R,
    pos: u64,
    remaining: u64,
    padding: u64,
    entry_start: u64,
    data_start: u64,
    done: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pos: 0,
            remaining: 0,
            padding: 0,
            entry_start: 0,
            data_start: 0,
            done: false,
        }
    }

    /// Skips whatever is left of the current entry and parses the next
    /// header. Returns `None` once the end-of-archive marker or a clean EOF
    /// is reached.
    pub fn next_entry(&mut self) -> Result<Option<Header>> {
        if self.done {
            return Ok(None);
        }
        self.skip_rest()?;
        self.entry_start = self.pos;

        let mut pending = Pending::default();
        loop {
            let Some(block) = self.read_block()? else {
                self.done = true;
                return Ok(None);
            };
            let Some((mut header, flag)) = parse_block(&block)? else {
                self.done = true;
                return Ok(None);
            };
            match flag {
                TYPE_GNU_LONGNAME => pending.path = Some(cstr(&self.read_ext(header.size)?)),
                TYPE_GNU_LONGLINK => pending.link = Some(cstr(&self.read_ext(header.size)?)),
                TYPE_PAX => pending.apply_records(&self.read_ext(header.size)?)?,
                TYPE_PAX_GLOBAL => {
                    // global defaults are not carried over to later entries
                    self.read_ext(header.size)?;
                }
                _ => {
                    pending.apply(&mut header);
                    if header.size.checked_add(padding(header.size)).is_none() {
                        return Err(TarfsError::format(format!(
                            "{}: entry size {} overflows",
                            header.path, header.size
                        )));
                    }
                    self.remaining = header.size;
                    self.padding = padding(header.size);
                    self.data_start = self.pos;
                    trace!(path = %header.path, size = header.size, at = self.entry_start, "tar entry");
                    return Ok(Some(header));
                }
            }
        }
    }

    /// Offset of the first header block (extension blocks included) of the
    /// most recently located entry.
    pub fn entry_start(&self) -> u64 {
        self.entry_start
    }

    /// Offset of the current entry's first data byte.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    fn skip_rest(&mut self) -> Result<()> {
        let n = self
            .remaining
            .checked_add(self.padding)
            .ok_or_else(|| TarfsError::format("entry size overflows"))?;
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| TarfsError::format("entry extends past the addressable range"))?;
        discard(&mut self.inner, n).map_err(truncated)?;
        self.pos = end;
        self.remaining = 0;
        self.padding = 0;
        Ok(())
    }

    fn read_block(&mut self) -> Result<Option<[u8; BLOCK_LEN]>> {
        let mut block = [0u8; BLOCK_LEN];
        let mut filled = 0;
        while filled < BLOCK_LEN {
            match self.inner.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.pos += filled as u64;
        match filled {
            0 => Ok(None),
            BLOCK_LEN => Ok(Some(block)),
            _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated tar header").into()),
        }
    }

    fn read_ext(&mut self, size: u64) -> Result<Vec<u8>> {
        if size > MAX_EXT_LEN {
            return Err(TarfsError::format(format!(
                "extension header of {size} bytes exceeds {MAX_EXT_LEN}"
            )));
        }
        let mut buf = vec![0u8; size as usize];
        self.inner.read_exact(&mut buf)?;
        let pad = padding(size);
        discard(&mut self.inner, pad).map_err(truncated)?;
        self.pos += size + pad;
        Ok(buf)
    }
}

impl<R: Read + Seek> Decoder<R> {
    /// Rewinds the inner reader to offset zero and forgets all state, as if
    /// freshly constructed.
    pub fn restart(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.pos = 0;
        self.remaining = 0;
        self.padding = 0;
        self.entry_start = 0;
        self.data_start = 0;
        self.done = false;
        Ok(())
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let cap = self.remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..cap])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive truncated inside entry data",
            ));
        }
        self.remaining -= n as u64;
        self.pos += n as u64;
        Ok(n)
    }
}

fn truncated(e: TarfsError) -> TarfsError {
    match e {
        TarfsError::ShortDiscard { .. } => {
            io::Error::new(io::ErrorKind::UnexpectedEof, "truncated tar archive").into()
        }
        other => other,
    }
}

/// Overrides collected from extension headers, applied to the next real
/// entry.
#[derive(Default)]
struct Pending {
    path: Option<String>,
    link: Option<String>,
    size: Option<u64>,
    mtime: Option<OffsetDateTime>,
    uid: Option<u64>,
    gid: Option<u64>,
    uname: Option<String>,
    gname: Option<String>,
}

impl Pending {
    fn apply_records(&mut self, data: &[u8]) -> Result<()> {
        for (key, value) in parse_pax(data)? {
            match key.as_str() {
                "path" => self.path = Some(value),
                "linkpath" => self.link = Some(value),
                "size" => self.size = Some(parse_pax_int(&key, &value)?),
                "uid" => self.uid = Some(parse_pax_int(&key, &value)?),
                "gid" => self.gid = Some(parse_pax_int(&key, &value)?),
                "uname" => self.uname = Some(value),
                "gname" => self.gname = Some(value),
                "mtime" => self.mtime = Some(parse_pax_time(&value)?),
                _ => {}
            }
        }
        Ok(())
    }

    fn apply(self, h: &mut Header) {
        if let Some(p) = self.path {
            h.path = p;
        }
        if let Some(l) = self.link {
            h.link_name = l;
        }
        if let Some(s) = self.size {
            h.size = s;
        }
        if let Some(t) = self.mtime {
            h.mtime = t;
        }
        if let Some(u) = self.uid {
            h.uid = u;
        }
        if let Some(g) = self.gid {
            h.gid = g;
        }
        if let Some(u) = self.uname {
            h.uname = u;
        }
        if let Some(g) = self.gname {
            h.gname = g;
        }
    }
}

/// Records have the form `"<len> <key>=<value>\n"`, `len` counting the
/// whole record.
fn parse_pax(mut data: &[u8]) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        // NUL padding sometimes trails the last record
        if data.iter().all(|&b| b == 0) {
            break;
        }
        let sp = data
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| TarfsError::format("pax record without length"))?;
        let len: usize = std::str::from_utf8(&data[..sp])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| TarfsError::format("bad pax record length"))?;
        if len <= sp + 1 || len > data.len() || data[len - 1] != b'\n' {
            return Err(TarfsError::format("malformed pax record"));
        }
        let record = &data[sp + 1..len - 1];
        let eq = record
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| TarfsError::format("pax record without '='"))?;
        out.push((
            String::from_utf8_lossy(&record[..eq]).into_owned(),
            String::from_utf8_lossy(&record[eq + 1..]).into_owned(),
        ));
        data = &data[len..];
    }
    Ok(out)
}

fn parse_pax_int(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| TarfsError::format(format!("bad pax {key}: {value:?}")))
}

fn parse_pax_time(value: &str) -> Result<OffsetDateTime> {
    let bad = || TarfsError::format(format!("bad pax mtime: {value:?}"));
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (secs, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let secs: i128 = secs.parse().map_err(|_| bad())?;
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let mut nanos = 0i128;
    for (i, b) in frac.bytes().take(9).enumerate() {
        nanos += i128::from(b - b'0') * 10i128.pow(8 - i as u32);
    }
    let mut total = secs
        .checked_mul(1_000_000_000)
        .and_then(|v| v.checked_add(nanos))
        .ok_or_else(bad)?;
    if negative {
        total = -total;
    }
    OffsetDateTime::from_unix_timestamp_nanos(total).map_err(|_| bad())
}
