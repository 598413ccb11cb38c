use crate::error::Result;
use std::io::{self, Read, Write};
use tracing::debug;

pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl CodecId {
    /// Identifies the codec from the first bytes of a stream.
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(&ZSTD_MAGIC) {
            CodecId::Zstd
        } else {
            CodecId::Store
        }
    }
}

pub trait Decompressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64>;
}

pub fn get_decoder(id: CodecId) -> Box<dyn Decompressor> {
    match id {
        CodecId::Store => Box::new(store::Store),
        CodecId::Zstd => Box::new(zstdc::ZstdDecompressor),
    }
}

/// Reads the first bytes of `r` and reports the codec, returning the peeked
/// bytes so the caller can chain them back in front.
pub fn peek_codec<R: Read>(r: &mut R) -> io::Result<(CodecId, Vec<u8>)> {
    let mut head = Vec::with_capacity(ZSTD_MAGIC.len());
    r.by_ref()
        .take(ZSTD_MAGIC.len() as u64)
        .read_to_end(&mut head)?;
    Ok((CodecId::sniff(&head), head))
}

/// Decodes a whole stream, plain or compressed, into memory.
pub fn load<R: Read>(mut r: R) -> Result<Vec<u8>> {
    let (id, head) = peek_codec(&mut r)?;
    let dec = get_decoder(id);
    let mut src = head.as_slice().chain(r);
    let mut out = Vec::new();
    let n = dec.decompress(&mut src, &mut out)?;
    debug!(codec = ?dec.id(), bytes = n, "loaded archive into memory");
    Ok(out)
}

pub mod store;
pub mod zstdc;
