/// Path of the archive root in normalized form.
pub const ROOT: &str = ".";

/// Last segment of `path`, trailing slashes ignored. Empty paths and the
/// root come back as `"."`.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { ROOT } else { "/" };
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Canonical form used as an index key: no leading `/` or `./`, no empty
/// or `.` segments, no trailing slash. Returns `None` when a `..` segment
/// would escape the root.
pub fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => return None,
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        Some(ROOT.to_string())
    } else {
        Some(parts.join("/"))
    }
}

/// Parent of a normalized path; the root has none.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(i) => Some(&path[..i]),
        None => Some(ROOT),
    }
}

/// Joins a normalized directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
