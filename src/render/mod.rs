//! Turning a snapshot's page images into one grid frame.

pub(crate) mod blend;
pub(crate) mod grid;

use image::{Rgba, RgbaImage, imageops};

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::project::config::{CropMargins, CropSettings};
use crate::snapshot::ChangedRegion;

pub use blend::{BOX_TINT, PAGE_TINT};
pub use grid::GridLayout;

#[derive(Clone, Debug)]
pub struct FrameOptions {
    pub layout: GridLayout,
    /// Gaussian blur sigma; `0` disables it.
    pub blur: f32,
    pub highlight: bool,
    pub crop: CropSettings,
}

/// Blur, highlight, crop, then lay out pages as a grid.
///
/// Regions are in page coordinates, so they are drawn before cropping.
pub fn compose_frame(
    pages: Vec<RgbaImage>,
    regions: &[ChangedRegion],
    options: &FrameOptions,
) -> TimelapseResult<RgbaImage> {
    if pages.is_empty() {
        return Err(TimelapseError::stage("no page images to assemble"));
    }

    let mut out = Vec::with_capacity(pages.len().min(options.layout.cells()));
    for (i, mut page) in pages.into_iter().take(options.layout.cells()).enumerate() {
        if options.blur > 0.0 {
            page = imageops::blur(&page, options.blur);
        }
        if options.highlight {
            let page_no = (i + 1) as u32;
            let on_page: Vec<&ChangedRegion> =
                regions.iter().filter(|r| r.page == page_no).collect();
            highlight_page(&mut page, &on_page)?;
        }
        if let Some(margins) = options.crop.margins_for(i) {
            page = crop_page(&page, margins)?;
        }
        out.push(page);
    }

    let pages = grid::fit_pages(out, options.layout);
    grid::compose(&pages, options.layout.columns)
}

/// Tint the whole page when it has any region, with a stronger tint inside each region.
pub fn highlight_page(page: &mut RgbaImage, regions: &[&ChangedRegion]) -> TimelapseResult<()> {
    if regions.is_empty() {
        return Ok(());
    }
    let (w, h) = page.dimensions();
    let mut overlay = RgbaImage::from_pixel(w, h, Rgba(PAGE_TINT));
    for region in regions {
        let (left, top, rw, rh) = region.to_pixels(w, h);
        blend::fill_rect(&mut overlay, left, top, rw, rh, BOX_TINT);
    }
    blend::over_in_place(page, &overlay)
}

pub fn crop_page(page: &RgbaImage, m: CropMargins) -> TimelapseResult<RgbaImage> {
    let (w, h) = page.dimensions();
    let keep_w = w.checked_sub(m.left.saturating_add(m.right)).filter(|v| *v > 0);
    let keep_h = h.checked_sub(m.top.saturating_add(m.bottom)).filter(|v| *v > 0);
    match (keep_w, keep_h) {
        (Some(cw), Some(ch)) => Ok(imageops::crop_imm(page, m.left, m.top, cw, ch).to_image()),
        _ => Err(TimelapseError::stage(format!(
            "crop margins {m:?} leave nothing of a {w}x{h} page"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
