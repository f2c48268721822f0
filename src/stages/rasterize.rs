use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::foundation::process;
use crate::project::config::Config;
use crate::snapshot::{Snapshot, StageId};
use crate::stages::{Stage, StageContext, remove_path};

const SCRATCH_DIR: &str = ".texlapse-pages";

/// Render every PDF page to PNG and move the images into the project.
pub struct Rasterize {
    dpi: u32,
}

impl Default for Rasterize {
    fn default() -> Self {
        Self {
            dpi: Config::default().raster_dpi,
        }
    }
}

impl Stage for Rasterize {
    fn id(&self) -> StageId {
        StageId::Rasterize
    }

    fn init(&mut self, config: &Config) -> TimelapseResult<()> {
        self.dpi = config.raster_dpi;
        Ok(())
    }

    fn run(&self, snapshot: &mut Snapshot, ctx: &StageContext<'_>) -> TimelapseResult<()> {
        let work_dir = snapshot.work_dir()?.to_path_buf();
        let pdf = work_dir.join(snapshot.pdf_file()?);
        let scratch = work_dir.join(SCRATCH_DIR);
        remove_path(&scratch);
        std::fs::create_dir_all(&scratch)
            .with_context(|| format!("create {}", scratch.display()))?;

        let dpi = self.dpi.to_string();
        let prefix = scratch.join("page");
        process::checked(
            &work_dir,
            "pdftoppm",
            [
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )?;

        if list_pngs(&scratch)?.is_empty() {
            remove_path(&scratch);
            return Err(TimelapseError::stage(format!(
                "rasterizer produced no pages for {}",
                pdf.display()
            )));
        }

        let dest = ctx.paths.images_dir(snapshot.commit());
        remove_path(&dest);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        move_dir(&scratch, &dest)?;

        snapshot.pages = list_pngs(&dest)?;
        tracing::debug!(commit = %snapshot.short_commit(), pages = snapshot.pages.len(), "rasterized");
        Ok(())
    }

    fn reset(&self, snapshot: &mut Snapshot, ctx: &StageContext<'_>) {
        snapshot.pages.clear();
        remove_path(&ctx.paths.images_dir(snapshot.commit()));
    }
}

/// PNG files in `dir`, sorted by name (`page-01.png`, `page-02.png`, ...).
pub(crate) fn list_pngs(dir: &Path) -> TimelapseResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    let mut pages = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

/// Rename, falling back to copy-and-delete across file systems.
fn move_dir(from: &Path, to: &Path) -> TimelapseResult<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    for entry in std::fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        std::fs::copy(entry.path(), &target)
            .with_context(|| format!("copy to {}", target.display()))?;
    }
    remove_path(from);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/stages/rasterize.rs"]
mod tests;
