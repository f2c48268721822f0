use std::path::{Path, PathBuf};

use crate::changes::{ChangeMapper, PageGeometry, SynctexMapper, page_size};
use crate::document::IncludeGraph;
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::foundation::process;
use crate::project::config::Config;
use crate::snapshot::{Snapshot, StageId};
use crate::stages::{Stage, StageContext, remove_path};

/// Compile the main document and map this commit's changes onto the produced pages.
pub struct Compile {
    program: String,
    args: Vec<String>,
    install_missing_packages: bool,
    tolerate_errors: bool,
    raster_dpi: u32,
    mapper: ChangeMapper,
}

impl Default for Compile {
    fn default() -> Self {
        let config = Config::default();
        Self {
            program: String::new(),
            args: Vec::new(),
            install_missing_packages: config.install_missing_packages,
            tolerate_errors: config.tolerate_compile_errors,
            raster_dpi: config.raster_dpi,
            mapper: config.change_mapper(),
        }
    }
}

impl Compile {
    /// Compile the snapshot's main document and return the PDF path.
    fn build_pdf(&self, snapshot: &Snapshot) -> TimelapseResult<PathBuf> {
        if self.program.is_empty() {
            return Err(TimelapseError::validation("compile stage used before init"));
        }
        let work_dir = snapshot.work_dir()?.to_path_buf();
        let main_file = snapshot.main_file()?.to_string();
        let main = Path::new(&main_file);
        let compile_dir = work_dir.join(main.parent().unwrap_or_else(|| Path::new("")));
        let file_name = main
            .file_name()
            .ok_or_else(|| TimelapseError::stage(format!("bad main file '{main_file}'")))?;
        let pdf = work_dir.join(snapshot.pdf_file()?);

        // A PDF left over from another commit in this directory must not count as output.
        remove_path(&pdf);

        if self.install_missing_packages {
            match process::output(&compile_dir, "texliveonfly", [file_name]) {
                Ok(out) if !out.success => {
                    tracing::debug!(error = %out.failure_text(), "texliveonfly failed");
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "texliveonfly unavailable"),
            }
        }

        let mut args: Vec<&std::ffi::OsStr> = self.args.iter().map(|a| a.as_ref()).collect();
        args.push(file_name);
        let out = process::output(&compile_dir, &self.program, args)?;

        if !out.success {
            if self.tolerate_errors && pdf.is_file() {
                tracing::debug!(
                    commit = %snapshot.short_commit(),
                    "compiler reported errors but produced a PDF"
                );
            } else {
                return Err(TimelapseError::tool(out.failure_text()));
            }
        }
        if !pdf.is_file() {
            return Err(TimelapseError::stage(format!(
                "compiler produced no PDF at {}",
                pdf.display()
            )));
        }

        Ok(pdf)
    }

    fn map_changes(&self, snapshot: &mut Snapshot, work_dir: &Path, main_file: &str, pdf: &Path) {
        snapshot.changed_regions.clear();
        if snapshot.git_diff.is_empty() {
            return;
        }

        let (width_pt, height_pt) = page_size(pdf);
        let geometry = match PageGeometry::from_dpi(width_pt, height_pt, self.raster_dpi) {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(commit = %snapshot.short_commit(), error = %e, "unusable page geometry");
                return;
            }
        };
        let graph = match IncludeGraph::scan(work_dir, main_file) {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(commit = %snapshot.short_commit(), error = %e, "include scan failed");
                return;
            }
        };
        let locator = match SynctexMapper::new(work_dir, main_file) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(commit = %snapshot.short_commit(), error = %e, "page locator unavailable");
                return;
            }
        };

        snapshot.changed_regions = self
            .mapper
            .map(&snapshot.git_diff, &graph, &locator, &geometry);
        tracing::debug!(
            commit = %snapshot.short_commit(),
            regions = snapshot.changed_regions.len(),
            "mapped changes"
        );
    }
}

impl Stage for Compile {
    fn id(&self) -> StageId {
        StageId::Compile
    }

    fn init(&mut self, config: &Config) -> TimelapseResult<()> {
        let (program, args) = config.latex_command()?;
        self.program = program;
        self.args = args;
        self.install_missing_packages = config.install_missing_packages;
        self.tolerate_errors = config.tolerate_compile_errors;
        self.raster_dpi = config.raster_dpi;
        self.mapper = config.change_mapper();
        Ok(())
    }

    fn run(&self, snapshot: &mut Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        let pdf = self.build_pdf(snapshot)?;
        let work_dir = snapshot.work_dir()?.to_path_buf();
        let main_file = snapshot.main_file()?.to_string();
        self.map_changes(snapshot, &work_dir, &main_file, &pdf);
        Ok(())
    }

    fn restore(&self, snapshot: &Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        self.build_pdf(snapshot).map(drop)
    }

    fn reset(&self, snapshot: &mut Snapshot, _ctx: &StageContext<'_>) {
        snapshot.changed_regions.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stages/compile.rs"]
mod tests;
