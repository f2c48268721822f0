use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::changes::regions::PageHit;
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::foundation::process;

static RE_PAGE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Page size:\s+([0-9.]+)\s+x\s+([0-9.]+)\s+pts").expect("valid page size regex")
});

/// US Letter, used when the PDF page size cannot be read.
pub const FALLBACK_PAGE_SIZE_PT: (f64, f64) = (612.0, 792.0);

/// Locates where a source line landed in the compiled document.
pub trait PageMapper: Sync {
    /// `source` is relative to the snapshot working directory; `line` is 1-based.
    fn locate(&self, source: &str, line: u32) -> TimelapseResult<Vec<PageHit>>;
}

/// [`PageMapper`] backed by the `synctex view` command line tool.
#[derive(Clone, Debug)]
pub struct SynctexMapper {
    work_dir: PathBuf,
    /// Directory the compiler ran in (the main file's directory).
    compile_dir: PathBuf,
    pdf: PathBuf,
}

impl SynctexMapper {
    pub fn new(work_dir: &Path, main_file: &str) -> TimelapseResult<Self> {
        let work_dir = std::path::absolute(work_dir)?;
        let main = Path::new(main_file);
        let compile_dir = work_dir.join(main.parent().unwrap_or_else(|| Path::new("")));
        let pdf = work_dir.join(main.with_extension("pdf"));
        Ok(Self {
            work_dir,
            compile_dir,
            pdf,
        })
    }

    /// The input name as the compiler recorded it: `<compile dir>/./<relative path>`.
    fn input_name(&self, source: &str) -> String {
        let full = self.work_dir.join(source);
        match full.strip_prefix(&self.compile_dir) {
            Ok(rel) => format!("{}/./{}", self.compile_dir.display(), rel.display()),
            Err(_) => full.display().to_string(),
        }
    }
}

impl PageMapper for SynctexMapper {
    fn locate(&self, source: &str, line: u32) -> TimelapseResult<Vec<PageHit>> {
        let input = format!("{line}:0:{}", self.input_name(source));
        let pdf = self.pdf.to_string_lossy().into_owned();
        let out = process::checked(
            &self.compile_dir,
            "synctex",
            ["view", "-i", input.as_str(), "-o", pdf.as_str()],
        )?;
        Ok(parse_view_output(&out))
    }
}

/// Parse the `Page:`/`x:`/`y:`/`h:`/`v:`/`W:`/`H:` records printed by `synctex view`.
///
/// Incomplete records are dropped.
pub fn parse_view_output(out: &str) -> Vec<PageHit> {
    #[derive(Default)]
    struct Partial {
        page: Option<u32>,
        x: Option<f64>,
        y: Option<f64>,
        h: Option<f64>,
        v: Option<f64>,
        width: Option<f64>,
        height: Option<f64>,
    }

    impl Partial {
        fn finish(&self) -> Option<PageHit> {
            Some(PageHit {
                page: self.page?,
                x: self.x?,
                y: self.y?,
                h: self.h?,
                v: self.v?,
                width: self.width?,
                height: self.height?,
            })
        }
    }

    let mut hits = Vec::new();
    let mut current: Option<Partial> = None;

    for line in out.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if key == "Page" {
            if let Some(hit) = current.take().and_then(|p| p.finish()) {
                hits.push(hit);
            }
            current = Some(Partial {
                page: value.parse().ok(),
                ..Partial::default()
            });
            continue;
        }
        let Some(partial) = current.as_mut() else {
            continue;
        };
        let num = value.parse::<f64>().ok();
        match key {
            "x" => partial.x = num,
            "y" => partial.y = num,
            "h" => partial.h = num,
            "v" => partial.v = num,
            "W" => partial.width = num,
            "H" => partial.height = num,
            _ => {}
        }
    }
    if let Some(hit) = current.and_then(|p| p.finish()) {
        hits.push(hit);
    }
    hits
}

/// Page size in points from `pdfinfo`, or [`FALLBACK_PAGE_SIZE_PT`] when unavailable.
pub fn page_size(pdf: &Path) -> (f64, f64) {
    let dir = pdf.parent().unwrap_or_else(|| Path::new("."));
    match process::checked(dir, "pdfinfo", [pdf.as_os_str()]) {
        Ok(out) => parse_page_size(&out).unwrap_or_else(|| {
            tracing::debug!(pdf = %pdf.display(), "pdfinfo reported no page size, assuming letter");
            FALLBACK_PAGE_SIZE_PT
        }),
        Err(e) => {
            tracing::debug!(pdf = %pdf.display(), error = %e, "pdfinfo failed, assuming letter");
            FALLBACK_PAGE_SIZE_PT
        }
    }
}

pub fn parse_page_size(pdfinfo: &str) -> Option<(f64, f64)> {
    let cap = RE_PAGE_SIZE.captures(pdfinfo)?;
    let w: f64 = cap[1].parse().ok()?;
    let h: f64 = cap[2].parse().ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

/// Fails unless `synctex` can be spawned.
pub fn ensure_available() -> TimelapseResult<()> {
    if process::is_on_path("synctex") {
        Ok(())
    } else {
        Err(TimelapseError::tool(
            "synctex not found on PATH; it is required for change highlighting",
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/changes/synctex.rs"]
mod tests;
