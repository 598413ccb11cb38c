use crate::error::{Result, TarfsError};
use crate::fs::TarFs;
use crate::read::entry::DirEntry;
use crate::source::ReadAt;
use crate::util::path::{join, normalize};
use crate::vfs::{Close, ReadDir};

/// Depth-first, name-ordered walk below `root`, reading each directory in
/// pages of `page` entries. `visit` gets the normalized path of every
/// descendant; the root itself is not visited.
pub fn walk<S, F>(fs: &TarFs<S>, root: &str, page: usize, mut visit: F) -> Result<()>
where
    S: ReadAt + ?Sized,
    F: FnMut(&str, &DirEntry) -> Result<()>,
{
    let root = normalize(root).ok_or_else(|| TarfsError::InvalidPath(root.to_string()))?;
    walk_dir(fs, &root, page.max(1), &mut visit)
}

fn walk_dir<S, F>(fs: &TarFs<S>, dir: &str, page: usize, visit: &mut F) -> Result<()>
where
    S: ReadAt + ?Sized,
    F: FnMut(&str, &DirEntry) -> Result<()>,
{
    let mut handle = fs.open_dir(dir)?;
    loop {
        let batch = match handle.read_entries(Some(page)) {
            Ok(b) => b,
            Err(e) if e.is_end_of_listing() => break,
            Err(e) => return Err(e),
        };
        for entry in &batch {
            let path = join(dir, entry.name());
            visit(&path, entry)?;
            if entry.is_dir() {
                walk_dir(fs, &path, page, visit)?;
            }
        }
    }
    handle.close()
}
