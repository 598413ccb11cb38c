use std::io::Read;

use crate::domain::{FileRow, Metadata};
use crate::error::Result;
use crate::fs::TarFs;
use crate::read::dir::DirHandle;
use crate::repo::ArchiveRepo;
use crate::source::ReadAt;
use crate::stats::Stats;
use crate::util::path::ROOT;
use crate::vfs::SeekableFile;
use crate::walk::walk;

const LIST_PAGE: usize = 256;

impl<S: ReadAt + ?Sized + 'static> ArchiveRepo for TarFs<S> {
    fn list_files(&self) -> Result<Vec<FileRow>> {
        let mut rows = Vec::with_capacity(self.index().len());
        walk(self, ROOT, LIST_PAGE, |path, entry| {
            let info = entry.info()?;
            rows.push(FileRow {
                path: path.to_string(),
                size: info.size,
                mode: info.mode,
                mtime: info.mtime,
            });
            Ok(())
        })?;
        Ok(rows)
    }

    fn stat(&self, path: &str) -> Result<Metadata> {
        TarFs::stat(self, path)
    }

    fn open_dir(&self, path: &str) -> Result<DirHandle> {
        TarFs::open_dir(self, path)
    }

    fn open_reader(&self, path: &str) -> Result<Box<dyn SeekableFile + Send + '_>> {
        let f = self.open_file(path)?;
        // Box to erase the source type
        Ok(Box::new(f))
    }

    fn open_range(&self, path: &str, start: u64, len: u64) -> Result<Box<dyn Read + Send + '_>> {
        let mut f = self.open_file(path)?;
        f.seek_start(start)?;
        Ok(Box::new(f.take(len)))
    }

    fn stats(&self) -> Stats {
        TarFs::stats(self).clone()
    }
}
