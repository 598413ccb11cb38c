use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, TarfsError};
use crate::policy::Policy;
use crate::read::entry::{DirEntry, sort_entries};
use crate::section::Section;
use crate::source::ReadAt;
use crate::stats::Stats;
use crate::tar::decoder::Decoder;
use crate::tar::header::{EntryKind, Header};
use crate::util::path::{ROOT, normalize, parent};

/// Where an entry lives in the archive: from its first header block
/// (extension headers included) to the end of its data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub len: u64,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub header: Arc<Header>,
    /// `None` for directories synthesized from their children's paths.
    pub span: Option<Span>,
    /// Sorted by name; empty for anything but directories.
    pub children: Arc<[DirEntry]>,
}

/// Path → entry map built from one sequential pass over an archive.
///
/// Keys and header paths are normalized (see [`normalize`]); the root is
/// `"."`.
#[derive(Clone, Debug, Default)]
pub struct TarIndex {
    by_path: BTreeMap<String, Node>,
    stats: Stats,
}

impl TarIndex {
    pub fn build<S: ReadAt + ?Sized>(src: &Arc<S>, policy: &Policy) -> Result<Self> {
        let view = Section::whole(Arc::clone(src))?;
        let archive_bytes = view.size();
        let mut dec = Decoder::new(view);
        let mut stats = Stats {
            archive_bytes,
            ..Stats::default()
        };

        let mut raw: BTreeMap<String, (Header, Option<Span>)> = BTreeMap::new();
        let mut seen = 0u64;
        while let Some(mut header) = dec.next_entry()? {
            seen += 1;
            if let Some(max) = policy.max_entries {
                if seen > max {
                    return Err(TarfsError::Policy(format!("archive has more than {max} entries")));
                }
            }
            if let Some(max) = policy.max_entry_size {
                if header.size > max {
                    return Err(TarfsError::Policy(format!(
                        "{}: {} bytes exceeds limit of {max}",
                        header.path, header.size
                    )));
                }
            }
            let Some(path) = normalize(&header.path) else {
                if policy.reject_unsafe_paths {
                    return Err(TarfsError::InvalidPath(header.path));
                }
                warn!(path = %header.path, "skipping entry outside the archive root");
                stats.skipped += 1;
                continue;
            };
            if path == ROOT && !header.is_dir() {
                warn!(path = %header.path, "skipping non-directory entry for the root");
                stats.skipped += 1;
                continue;
            }
            let end = dec.data_start().checked_add(header.size).ok_or_else(|| {
                TarfsError::format(format!("{}: entry data overflows the archive", header.path))
            })?;
            let span = Span {
                start: dec.entry_start(),
                len: end - dec.entry_start(),
            };
            header.path = path.clone();
            // later entries shadow earlier ones, as on extraction
            raw.insert(path, (header, Some(span)));
        }

        let paths: Vec<String> = raw.keys().cloned().collect();
        for p in &paths {
            let mut cur = parent(p);
            while let Some(dir) = cur {
                if raw.contains_key(dir) {
                    break;
                }
                raw.insert(dir.to_string(), (Header::new(dir, EntryKind::Directory, 0), None));
                stats.implicit_dirs += 1;
                cur = parent(dir);
            }
        }
        if !raw.contains_key(ROOT) {
            raw.insert(ROOT.to_string(), (Header::new(ROOT, EntryKind::Directory, 0), None));
            stats.implicit_dirs += 1;
        }

        // keys sort parents before children, so one ordered pass sees every
        // dropped ancestor before its descendants
        let mut dropped: BTreeSet<String> = BTreeSet::new();
        for path in raw.keys() {
            let Some(par) = parent(path) else { continue };
            let orphaned = dropped.contains(par)
                || raw.get(par).is_some_and(|(ph, _)| !ph.is_dir());
            if orphaned {
                dropped.insert(path.clone());
            }
        }
        for path in &dropped {
            if let Some((_, span)) = raw.remove(path) {
                if span.is_none() {
                    stats.implicit_dirs -= 1;
                } else {
                    warn!(path = %path, "parent is not a directory; skipping entry");
                    stats.skipped += 1;
                }
            }
        }

        let shared: BTreeMap<String, (Arc<Header>, Option<Span>)> = raw
            .into_iter()
            .map(|(k, (h, s))| (k, (Arc::new(h), s)))
            .collect();

        let mut kids: BTreeMap<&str, Vec<DirEntry>> = BTreeMap::new();
        for (path, (header, _)) in &shared {
            if let Some(par) = parent(path) {
                kids.entry(par)
                    .or_default()
                    .push(DirEntry::new(Arc::clone(header)));
            }
        }

        let mut by_path = BTreeMap::new();
        for (path, (header, span)) in &shared {
            let children: Arc<[DirEntry]> = match kids.remove(path.as_str()) {
                Some(mut v) => {
                    sort_entries(&mut v);
                    v.into()
                }
                None => Arc::new([]),
            };
            match header.kind {
                EntryKind::Directory => stats.dirs += 1,
                EntryKind::Symlink => stats.symlinks += 1,
                EntryKind::Regular | EntryKind::Link => {
                    stats.files += 1;
                    stats.logical_bytes += header.size;
                }
                _ => stats.others += 1,
            }
            by_path.insert(
                path.clone(),
                Node {
                    header: Arc::clone(header),
                    span: *span,
                    children,
                },
            );
        }

        debug!(
            entries = by_path.len(),
            implicit_dirs = stats.implicit_dirs,
            skipped = stats.skipped,
            "indexed archive"
        );
        Ok(Self { by_path, stats })
    }

    /// Looks up an already-normalized path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.by_path.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> + '_ {
        self.by_path.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}
