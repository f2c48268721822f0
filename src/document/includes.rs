use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::paths::{has_extension, resolve_from};
use crate::foundation::error::{TimelapseError, TimelapseResult};

static RE_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:include|input|subfile)\s*\{([^}]+)\}").expect("valid include regex")
});
static RE_GRAPHICS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\includegraphics\*?\s*(?:\[[^\]]*\])?\s*\{([^}]+)\}")
        .expect("valid includegraphics regex")
});
static RE_BIBLIOGRAPHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(bibliography|addbibresource)\s*(?:\[[^\]]*\])?\s*\{([^}]+)\}")
        .expect("valid bibliography regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `\include`, `\input`, `\subfile`
    Include,
    /// `\includegraphics`
    Graphics,
    /// `\bibliography`, `\addbibresource`
    Bibliography,
}

/// One place in a source file that pulls in another file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub from: String,
    /// 1-based line in `from`.
    pub line: u32,
    pub target: String,
    pub kind: ReferenceKind,
}

/// How changes to a non-text asset are attributed to source lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Only the lines that directly reference the asset.
    #[default]
    ReferencingLine,
    /// The referencing lines plus every include line on the way down from the main file.
    IncludeChain,
}

/// Files reachable from the main document, in discovery order, plus every reference edge.
#[derive(Clone, Debug, Default)]
pub struct IncludeGraph {
    files: Vec<String>,
    references: Vec<Reference>,
}

impl IncludeGraph {
    /// Walk the document starting at `main_file` (relative to `root`).
    ///
    /// Targets are resolved relative to the main file's directory, which is where the compiler
    /// runs. Files that do not exist in this revision are skipped.
    pub fn scan(root: &Path, main_file: &str) -> TimelapseResult<Self> {
        let base_dir = Path::new(main_file)
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();

        let mut graph = IncludeGraph {
            files: vec![main_file.to_string()],
            references: Vec::new(),
        };
        let mut seen: BTreeSet<String> = graph.files.iter().cloned().collect();
        let mut unscanned = VecDeque::from([main_file.to_string()]);

        while let Some(file) = unscanned.pop_front() {
            let text = match std::fs::read(root.join(&file)) {
                Ok(bytes) => bytes,
                Err(e) if file == main_file => {
                    return Err(TimelapseError::stage(format!(
                        "failed to read main file '{file}': {e}"
                    )));
                }
                Err(e) => {
                    tracing::debug!(file = %file, error = %e, "skipping unreadable include");
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&text);

            for (idx, raw_line) in text.lines().enumerate() {
                let line = strip_comment(raw_line);
                if line.trim().is_empty() {
                    continue;
                }
                let line_no = (idx + 1) as u32;
                for (kind, target) in line_targets(root, &base_dir, line) {
                    graph.references.push(Reference {
                        from: file.clone(),
                        line: line_no,
                        target: target.clone(),
                        kind,
                    });
                    if seen.insert(target.clone()) {
                        graph.files.push(target.clone());
                        if target.ends_with(".tex") {
                            unscanned.push_back(target);
                        }
                    }
                }
            }
        }

        graph.files.retain(|f| root.join(f).is_file());
        Ok(graph)
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Source lines that should be treated as changed when `target` changes.
    pub fn referencing_lines(
        &self,
        target: &str,
        policy: ReferencePolicy,
    ) -> BTreeMap<String, BTreeSet<u32>> {
        let mut out: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([target.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for r in self.references.iter().filter(|r| r.target == current) {
                out.entry(r.from.clone()).or_default().insert(r.line);
                if policy == ReferencePolicy::IncludeChain {
                    queue.push_back(r.from.clone());
                }
            }
        }
        out
    }
}

/// Find the main document: the first `.tex` file, in sorted path order, containing `\begin{document}`.
pub fn find_main_file(root: &Path) -> TimelapseResult<String> {
    let mut candidates: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            let rel = rel.to_string_lossy().replace('\\', "/");
            rel.ends_with(".tex").then_some(rel)
        })
        .collect();
    candidates.sort();

    for rel in candidates {
        let Ok(bytes) = std::fs::read(root.join(&rel)) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        if text
            .lines()
            .any(|l| strip_comment(l).contains("\\begin{document}"))
        {
            return Ok(rel);
        }
    }

    Err(TimelapseError::stage(
        "could not find main .tex file (no file contains \\begin{document})",
    ))
}

/// Drop everything after the first unescaped `%`.
pub(crate) fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' {
            let backslashes = bytes[..i].iter().rev().take_while(|&&c| c == b'\\').count();
            if backslashes % 2 == 0 {
                return &line[..i];
            }
        }
    }
    line
}

fn line_targets(root: &Path, base_dir: &Path, line: &str) -> Vec<(ReferenceKind, String)> {
    let mut out = Vec::new();

    for cap in RE_INCLUDE.captures_iter(line) {
        let mut target = cap[1].trim().to_string();
        if !has_extension(&target) {
            target.push_str(".tex");
        }
        if let Some(resolved) = resolve_from(base_dir, &target) {
            out.push((ReferenceKind::Include, resolved));
        }
    }

    for cap in RE_GRAPHICS.captures_iter(line) {
        let target = cap[1].trim();
        if has_extension(target) {
            if let Some(resolved) = resolve_from(base_dir, target) {
                out.push((ReferenceKind::Graphics, resolved));
            }
        } else {
            for resolved in graphics_candidates(root, base_dir, target) {
                out.push((ReferenceKind::Graphics, resolved));
            }
        }
    }

    for cap in RE_BIBLIOGRAPHY.captures_iter(line) {
        let is_legacy = &cap[1] == "bibliography";
        for name in cap[2].split(',') {
            let mut target = name.trim().to_string();
            if target.is_empty() {
                continue;
            }
            if is_legacy && !target.ends_with(".bib") {
                target.push_str(".bib");
            }
            if let Some(resolved) = resolve_from(base_dir, &target) {
                out.push((ReferenceKind::Bibliography, resolved));
            }
        }
    }

    out
}

/// `\includegraphics{fig/plot}` may mean `fig/plot.pdf`, `fig/plot.png`, ...; take every sibling.
fn graphics_candidates(root: &Path, base_dir: &Path, target: &str) -> Vec<String> {
    let Some(stem_path) = resolve_from(base_dir, target) else {
        return Vec::new();
    };
    let stem_path = Path::new(&stem_path);
    let Some(stem) = stem_path.file_name().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let parent = stem_path.parent().unwrap_or_else(|| Path::new(""));
    let Ok(entries) = std::fs::read_dir(root.join(parent)) else {
        return Vec::new();
    };

    let mut found: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let (file_stem, _) = name.rsplit_once('.')?;
            (file_stem == stem).then(|| resolve_from(parent, &name))?
        })
        .collect();
    found.sort();
    found
}

#[cfg(test)]
#[path = "../../tests/unit/document/includes.rs"]
mod tests;
