use super::{CodecId, Decompressor};
use crate::error::Result;
use std::io::{Read, Write};

pub struct ZstdDecompressor;

impl Decompressor for ZstdDecompressor {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        let mut dec = zstd::stream::Decoder::new(src)?;
        let written_uncompressed = std::io::copy(&mut dec, dst)?;
        Ok(written_uncompressed)
    }
}
