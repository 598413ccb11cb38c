use std::fs::File;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{self, CodecId};
use crate::error::{Result, TarfsError};
use crate::fs::TarFs;
use crate::repo::{ArchiveRepo, OpenParams};

/// Where archive bytes are read from once the index is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain tar stays on disk, compressed tar is loaded into memory.
    #[default]
    Auto,
    /// Positioned reads against the file. Plain tar only.
    Fs,
    /// Whole archive decoded into a buffer.
    Memory,
}

pub fn open_repo(p: OpenParams) -> Result<Box<dyn ArchiveRepo>> {
    let backend = match p.backend {
        Backend::Auto => {
            let mut f = File::open(&p.archive_path)?;
            match codec::peek_codec(&mut f)?.0 {
                CodecId::Store => Backend::Fs,
                CodecId::Zstd => Backend::Memory,
            }
        }
        b => b,
    };
    debug!(archive = %p.archive_path.display(), ?backend, "opening archive");

    match backend {
        Backend::Memory => {
            let bytes = codec::load(File::open(&p.archive_path)?)?;
            Ok(Box::new(TarFs::with_policy(Arc::new(bytes), &p.policy)?))
        }
        _ => {
            let mut f = File::open(&p.archive_path)?;
            if codec::peek_codec(&mut f)?.0 != CodecId::Store {
                return Err(TarfsError::format(format!(
                    "{}: compressed archives need the memory backend",
                    p.archive_path.display()
                )));
            }
            // positioned reads ignore the cursor the peek moved
            Ok(Box::new(TarFs::with_policy(Arc::new(f), &p.policy)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_round_trip_through_serde() {
        let b: Backend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(b, Backend::Memory);
        assert_eq!(serde_json::to_string(&Backend::Auto).unwrap(), "\"auto\"");
    }

    #[test]
    fn missing_archive_is_io_error() {
        let p = OpenParams {
            archive_path: "/definitely/not/here.tar".into(),
            ..OpenParams::default()
        };
        assert!(matches!(open_repo(p), Err(TarfsError::Io(_))));
    }
}
