//! Minimal ustar writer for building fixtures in memory.
#![allow(dead_code)]

use std::sync::Arc;

use tarfs_core::TarFs;

const BLOCK: usize = 512;

#[derive(Default)]
pub struct TarBuilder {
    buf: Vec<u8>,
    mtime: u64,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            mtime: 1_700_000_000,
        }
    }

    /// Regular file; names over 100 bytes get a GNU long-name record.
    pub fn file(&mut self, path: &str, data: &[u8]) -> &mut Self {
        if path.len() > 100 {
            self.gnu_long_name(path);
        }
        self.header(path, b'0', data.len() as u64, 0o644, "", "");
        self.data(data);
        self
    }

    pub fn dir(&mut self, path: &str) -> &mut Self {
        self.header(path, b'5', 0, 0o755, "", "");
        self
    }

    pub fn symlink(&mut self, path: &str, target: &str) -> &mut Self {
        self.header(path, b'2', 0, 0o777, target, "");
        self
    }

    pub fn hard_link(&mut self, path: &str, target: &str) -> &mut Self {
        self.header(path, b'1', 0, 0o644, target, "");
        self
    }

    /// File whose name is split across the ustar `prefix` and `name` fields.
    pub fn prefixed_file(&mut self, prefix: &str, name: &str, data: &[u8]) -> &mut Self {
        self.header(name, b'0', data.len() as u64, 0o644, "", prefix);
        self.data(data);
        self
    }

    /// File described by a PAX record set; the ustar header carries
    /// `short_name` and a zero size so only the records are authoritative.
    pub fn pax_file(&mut self, short_name: &str, records: &[(&str, &str)], data: &[u8]) -> &mut Self {
        let mut body = Vec::new();
        for (k, v) in records {
            body.extend_from_slice(pax_record(k, v).as_bytes());
        }
        self.header("PaxHeaders/x", b'x', body.len() as u64, 0o644, "", "");
        self.data(&body);
        self.header(short_name, b'0', 0, 0o644, "", "");
        self.data(data);
        self
    }

    /// Global PAX header; readers skip it.
    pub fn pax_global(&mut self, records: &[(&str, &str)]) -> &mut Self {
        let mut body = Vec::new();
        for (k, v) in records {
            body.extend_from_slice(pax_record(k, v).as_bytes());
        }
        self.header("pax_global_header", b'g', body.len() as u64, 0o644, "", "");
        self.data(&body);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.buf);
        out.resize(out.len() + 2 * BLOCK, 0);
        out
    }

    fn gnu_long_name(&mut self, path: &str) {
        let mut name = path.as_bytes().to_vec();
        name.push(0);
        self.header("././@LongLink", b'L', name.len() as u64, 0o644, "", "");
        self.data(&name);
    }

    fn header(&mut self, name: &str, flag: u8, size: u64, mode: u32, link: &str, prefix: &str) {
        let mut b = [0u8; BLOCK];
        let n = name.len().min(100);
        b[..n].copy_from_slice(&name.as_bytes()[..n]);
        put_octal(&mut b[100..108], u64::from(mode));
        put_octal(&mut b[108..116], 1000);
        put_octal(&mut b[116..124], 1000);
        put_octal(&mut b[124..136], size);
        put_octal(&mut b[136..148], self.mtime);
        b[156] = flag;
        let l = link.len().min(100);
        b[157..157 + l].copy_from_slice(&link.as_bytes()[..l]);
        b[257..263].copy_from_slice(b"ustar\0");
        b[263..265].copy_from_slice(b"00");
        b[265..270].copy_from_slice(b"tests");
        b[297..302].copy_from_slice(b"tests");
        b[345..345 + prefix.len()].copy_from_slice(prefix.as_bytes());

        b[148..156].fill(b' ');
        let sum: u32 = b.iter().map(|&x| u32::from(x)).sum();
        b[148..156].copy_from_slice(format!("{sum:06o}\0 ").as_bytes());
        self.buf.extend_from_slice(&b);
    }

    fn data(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        let rem = data.len() % BLOCK;
        if rem != 0 {
            self.buf.resize(self.buf.len() + BLOCK - rem, 0);
        }
    }
}

fn put_octal(field: &mut [u8], v: u64) {
    let width = field.len() - 1;
    let s = format!("{v:0width$o}");
    field[..width].copy_from_slice(s.as_bytes());
    field[width] = 0;
}

fn pax_record(key: &str, value: &str) -> String {
    let body = format!(" {key}={value}\n");
    let mut len = body.len() + 1;
    loop {
        let rec = format!("{len}{body}");
        if rec.len() == len {
            return rec;
        }
        len = rec.len();
    }
}

pub fn mount(bytes: Vec<u8>) -> TarFs<Vec<u8>> {
    TarFs::new(Arc::new(bytes)).expect("fixture indexes")
}

/// `"0123456789"` at `data.txt`, plus a larger file spanning several blocks.
pub fn sample() -> TarFs<Vec<u8>> {
    mount(
        TarBuilder::new()
            .file("data.txt", b"0123456789")
            .file("big.bin", &pattern(3000))
            .finish(),
    )
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
