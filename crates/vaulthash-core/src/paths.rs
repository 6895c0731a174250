//! Vault path helpers
//!
//! Vault paths are forward-slash separated, case-sensitive and relative to the
//! vault root (no leading slash). All functions here are pure string
//! operations; none of them touch the filesystem.

/// Extension of the final path segment, without the dot
///
/// Returns an empty string when the file has no extension. A leading dot
/// (`.hidden`) does not start an extension.
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx + 1..],
        _ => "",
    }
}

/// Final path segment
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory part of a path, empty for files at the vault root
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Filename stem with `ext` stripped
pub fn basename<'a>(path: &'a str, ext: &str) -> &'a str {
    let name = file_name(path);
    if ext.is_empty() {
        return name;
    }
    name.strip_suffix(ext)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(name)
}

/// Replace the stem of `path`, keeping its directory and extension
///
/// `with_base_name("img/cat.png", "abc")` → `"img/abc.png"`
pub fn with_base_name(path: &str, new_base: &str) -> String {
    let ext = extension(path);
    let name = if ext.is_empty() {
        new_base.to_string()
    } else {
        format!("{}.{}", new_base, ext)
    };
    join(parent(path), &name)
}

/// Join a directory and a name into a vault path
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Resolve a link target against the document that contains it
///
/// A leading `/` makes the target vault-root absolute; otherwise it is
/// resolved from the containing document's directory. `.` segments are
/// dropped and `..` pops one level (never above the vault root).
///
/// Example: `resolve_relative("../img/a.png", "notes/daily/today.md")` →
/// `"notes/img/a.png"`
pub fn resolve_relative(link_target: &str, containing_document: &str) -> String {
    let mut segments: Vec<&str> = if link_target.starts_with('/') {
        Vec::new()
    } else {
        parent(containing_document)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    };

    for part in link_target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(part),
        }
    }

    segments.join("/")
}

/// Check whether a path lies inside `folder` (or is the folder itself)
pub fn is_under(path: &str, folder: &str) -> bool {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return false;
    }
    path == folder
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Check whether a link target points outside the vault (URL, mail link)
pub fn is_remote(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("mailto:") || lower.starts_with("data:")
}
