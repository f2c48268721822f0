use std::path::{Component, Path};

/// Lexically normalize a relative path to `a/b/c` form, resolving `.` and `..`.
///
/// Returns `None` when the path escapes its root or is absolute.
pub(crate) fn normalize_relative(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Resolve `target` as written inside a document living in `base_dir` (relative to the repo root).
pub(crate) fn resolve_from(base_dir: &Path, target: &str) -> Option<String> {
    normalize_relative(&base_dir.join(target.trim()))
}

pub(crate) fn has_extension(target: &str) -> bool {
    Path::new(target)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains('.'))
}

pub(crate) fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
#[path = "../../tests/unit/document/paths.rs"]
mod tests;
