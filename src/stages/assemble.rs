use anyhow::Context;

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::project::config::{Config, CropSettings};
use crate::render::{FrameOptions, GridLayout, compose_frame};
use crate::snapshot::{Snapshot, StageId};
use crate::stages::{Stage, StageContext, remove_path};

/// Lay the page images out as one frame of the timelapse.
pub struct Assemble {
    options: FrameOptions,
}

impl Default for Assemble {
    fn default() -> Self {
        let config = Config::default();
        Self {
            options: FrameOptions {
                layout: GridLayout {
                    rows: config.rows,
                    columns: config.columns,
                },
                blur: config.blur,
                highlight: config.highlight_changes,
                crop: CropSettings::default(),
            },
        }
    }
}

impl Stage for Assemble {
    fn id(&self) -> StageId {
        StageId::Assemble
    }

    fn init(&mut self, config: &Config) -> TimelapseResult<()> {
        self.options = FrameOptions {
            layout: GridLayout::new(config.rows, config.columns)?,
            blur: config.blur,
            highlight: config.highlight_changes,
            crop: config.crop,
        };
        Ok(())
    }

    /// Reads only the project's page images.
    fn uses_work_dir(&self) -> bool {
        false
    }

    fn run(&self, snapshot: &mut Snapshot, ctx: &StageContext<'_>) -> TimelapseResult<()> {
        if snapshot.pages.is_empty() {
            return Err(TimelapseError::stage(format!(
                "no page images for {}",
                snapshot.short_commit()
            )));
        }

        let mut pages = Vec::with_capacity(snapshot.pages.len());
        for path in snapshot.pages.iter().take(self.options.layout.cells()) {
            let page = image::open(path)
                .with_context(|| format!("open page image {}", path.display()))?
                .to_rgba8();
            pages.push(page);
        }

        let frame = compose_frame(pages, &snapshot.changed_regions, &self.options)?;

        let out = ctx.paths.frame(snapshot.index);
        if let Some(dir) = out.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        frame
            .save_with_format(&out, image::ImageFormat::Png)
            .with_context(|| format!("write frame {}", out.display()))?;
        snapshot.frame = Some(out);
        Ok(())
    }

    fn reset(&self, snapshot: &mut Snapshot, ctx: &StageContext<'_>) {
        let path = snapshot
            .frame
            .take()
            .unwrap_or_else(|| ctx.paths.frame(snapshot.index));
        remove_path(&path);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stages/assemble.rs"]
mod tests;
