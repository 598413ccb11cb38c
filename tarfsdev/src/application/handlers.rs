use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use tarfs_core::domain::FileRow;
use tarfs_core::error::{Result, TarfsError};
use tarfs_core::policy::Policy;
use tarfs_core::repo::{ArchiveRepo, OpenParams};
use tarfs_core::repo_factory::{Backend, open_repo};
use tarfs_core::util::path::{ROOT, normalize};
use tarfs_core::vfs::ReadDir;

/// Backend and policy shared by every subcommand.
pub struct Opener {
    backend: Backend,
    policy: Policy,
}

impl Opener {
    pub fn new(backend: Backend, policy_file: Option<&Path>) -> Result<Self> {
        let policy = match policy_file {
            Some(p) => load_policy(p)?,
            None => Policy::default(),
        };
        Ok(Self { backend, policy })
    }

    fn open(&self, archive: PathBuf) -> Result<Box<dyn ArchiveRepo>> {
        open_repo(OpenParams {
            archive_path: archive,
            backend: self.backend,
            policy: self.policy.clone(),
        })
    }
}

fn load_policy(path: &Path) -> Result<Policy> {
    let raw = std::fs::read(path)?;
    let policy: Policy = serde_json::from_slice(&raw)
        .map_err(|e| TarfsError::Policy(format!("{}: {e}", path.display())))?;
    debug!(file = %path.display(), ?policy, "loaded policy");
    Ok(policy)
}

fn rfc3339(t: OffsetDateTime) -> String {
    t.format(&Rfc3339)
        .unwrap_or_else(|_| t.unix_timestamp().to_string())
}

fn to_json<T: Serialize>(v: &T) -> Result<String> {
    serde_json::to_string_pretty(v).map_err(|e| TarfsError::Io(io::Error::other(e)))
}

/// `true` when `path` is `dir` itself or lies below it.
fn under(dir: &str, path: &str) -> bool {
    dir == ROOT
        || path == dir
        || (path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/')
}

fn clean(path: &str) -> Result<String> {
    normalize(path).ok_or_else(|| TarfsError::InvalidPath(path.to_string()))
}

fn print_row(r: &FileRow, long: bool) {
    if long {
        println!("{}  {:>12}  {}  {}", r.mode, r.size, rfc3339(r.mtime), r.path);
    } else {
        println!("{}", r.path);
    }
}

pub fn handle_list(open: &Opener, archive: PathBuf, prefix: Option<String>, long: bool) -> Result<()> {
    let repo = open.open(archive)?;
    let prefix = prefix.as_deref().map(clean).transpose()?;
    for r in repo.list_files()? {
        if prefix.as_deref().is_none_or(|p| under(p, &r.path)) {
            print_row(&r, long);
        }
    }
    Ok(())
}

pub fn handle_ls(open: &Opener, archive: PathBuf, path: String, page: usize, long: bool) -> Result<()> {
    let repo = open.open(archive)?;
    let mut dir = repo.open_dir(&path)?;
    let limit = (page > 0).then_some(page);
    let mut pages = 0usize;
    loop {
        let batch = match dir.read_entries(limit) {
            Ok(b) => b,
            Err(e) if e.is_end_of_listing() => break,
            Err(e) => return Err(e),
        };
        pages += 1;
        for e in &batch {
            if long {
                let m = e.info()?;
                println!("{}  {:>12}  {}  {}", m.mode, m.size, rfc3339(m.mtime), m.name);
            } else {
                println!("{}", e.name());
            }
        }
        // an unpaged read returns everything at once and never signals the end
        if limit.is_none() {
            break;
        }
    }
    debug!(path = %path, pages, "listed directory");
    Ok(())
}

pub fn handle_stat(open: &Opener, archive: PathBuf, path: String, json: bool) -> Result<()> {
    let repo = open.open(archive)?;
    let m = repo.stat(&path)?;
    if json {
        println!("{}", to_json(&m)?);
        return Ok(());
    }
    println!("  name: {}", m.name);
    println!("  size: {}", m.size);
    println!("  mode: {} ({:06o})", m.mode, m.mode.bits());
    println!(" mtime: {}", rfc3339(m.mtime));
    if let Some(t) = &m.link_target {
        println!("  link: {t}");
    }
    Ok(())
}

pub fn handle_cat(
    open: &Opener,
    archive: PathBuf,
    path: String,
    start: u64,
    len: Option<u64>,
    from_end: Option<u64>,
) -> Result<()> {
    let repo = open.open(archive)?;
    let mut reader = repo.open_reader(&path)?;
    match from_end {
        Some(n) => {
            let back = i64::try_from(n).map_err(|_| TarfsError::NegativePosition(i64::MIN))?;
            reader.seek(SeekFrom::End(-back))?;
        }
        None => {
            reader.seek(SeekFrom::Start(start))?;
        }
    }
    let mut out = io::stdout().lock();
    match len {
        Some(l) => io::copy(&mut reader.take(l), &mut out)?,
        None => io::copy(&mut reader, &mut out)?,
    };
    out.flush()?;
    Ok(())
}

pub fn handle_get(
    open: &Opener,
    archive: PathBuf,
    path: String,
    out: PathBuf,
    start: u64,
    len: Option<u64>,
) -> Result<()> {
    let repo = open.open(archive)?;
    let mut reader: Box<dyn Read + Send + '_> = match len {
        Some(l) => repo.open_range(&path, start, l)?,
        None if start > 0 => {
            let mut r = repo.open_reader(&path)?;
            r.seek(SeekFrom::Start(start))?;
            Box::new(r)
        }
        None => Box::new(repo.open_reader(&path)?),
    };
    let mut file = std::fs::File::create(&out)?;
    let n = io::copy(&mut reader, &mut file)?;
    info!(path = %path, out = %out.display(), bytes = n, "copied");
    eprintln!("get: {} -> {} ({n} bytes)", path, out.display());
    Ok(())
}

#[derive(Serialize)]
struct SumRow {
    path: String,
    size: u64,
    blake3: String,
}

fn digest(repo: &dyn ArchiveRepo, path: &str) -> Result<blake3::Hash> {
    let mut reader = repo.open_reader(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize())
}

pub fn handle_sum(open: &Opener, archive: PathBuf, path: String, json: bool) -> Result<()> {
    let repo = open.open(archive)?;
    let root = clean(&path)?;
    let files: Vec<FileRow> = repo
        .list_files()?
        .into_iter()
        .filter(|r| r.mode.is_regular() && under(&root, &r.path))
        .collect();

    // one handle per file; handles share nothing but the byte source
    let repo = repo.as_ref();
    let sums: Vec<SumRow> = files
        .par_iter()
        .map(|r| {
            Ok(SumRow {
                path: r.path.clone(),
                size: r.size,
                blake3: digest(repo, &r.path)?.to_hex().to_string(),
            })
        })
        .collect::<Result<_>>()?;

    if json {
        println!("{}", to_json(&sums)?);
    } else {
        for s in &sums {
            println!("{}  {}", s.blake3, s.path);
        }
    }
    Ok(())
}

pub fn handle_info(open: &Opener, archive: PathBuf, json: bool) -> Result<()> {
    let repo = open.open(archive)?;
    let s = repo.stats();
    if json {
        println!("{}", to_json(&s)?);
        return Ok(());
    }
    println!("        files: {}", s.files);
    println!("  directories: {} ({} implicit)", s.dirs, s.implicit_dirs);
    println!("     symlinks: {}", s.symlinks);
    println!("        other: {}", s.others);
    println!("      skipped: {}", s.skipped);
    println!("logical bytes: {}", s.logical_bytes);
    println!("archive bytes: {}", s.archive_bytes);
    Ok(())
}
