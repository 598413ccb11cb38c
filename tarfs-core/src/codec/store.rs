use super::{CodecId, Decompressor};
use crate::error::Result;
use std::io::{Read, Write};

pub struct Store;

impl Decompressor for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        Ok(std::io::copy(src, dst)?)
    }
}
