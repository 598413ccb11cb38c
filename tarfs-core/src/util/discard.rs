use std::io::{ErrorKind, Read};

use crate::error::{Result, TarfsError};

pub const SCRATCH_LEN: usize = 4096;

/// Reads and drops exactly `size` bytes from `r`.
///
/// Works on any forward-only stream; nothing here seeks. Hitting
/// end-of-stream early yields [`TarfsError::ShortDiscard`] with the count
/// that did get consumed. Other read errors are returned as-is.
pub fn discard<R: Read + ?Sized>(r: &mut R, size: u64) -> Result<()> {
    let mut buf = [0u8; SCRATCH_LEN];
    let mut total = 0u64;

    while total < size {
        let want = (size - total).min(SCRATCH_LEN as u64) as usize;
        match r.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(TarfsError::ShortDiscard {
                    requested: size,
                    discarded: total,
                });
            }
            Ok(n) => total += n as u64,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
