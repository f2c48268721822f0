use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::snapshot::ChangedRegion;

/// One box reported by the PDF locator, in PDF points.
///
/// `(h, v)` is the box origin used for highlighting; `(x, y)` is the anchor point of the queried
/// line and is kept for diagnostics only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageHit {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub h: f64,
    pub v: f64,
    pub width: f64,
    pub height: f64,
}

/// Page size in points next to the size of the rasterized page image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub page_width_pt: f64,
    pub page_height_pt: f64,
    pub image_width_px: u32,
    pub image_height_px: u32,
}

impl PageGeometry {
    pub fn new(
        page_width_pt: f64,
        page_height_pt: f64,
        image_width_px: u32,
        image_height_px: u32,
    ) -> TimelapseResult<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(page_width_pt) || !valid(page_height_pt) {
            return Err(TimelapseError::validation(format!(
                "page size must be positive, got {page_width_pt}x{page_height_pt} pt"
            )));
        }
        if image_width_px == 0 || image_height_px == 0 {
            return Err(TimelapseError::validation(format!(
                "image size must be positive, got {image_width_px}x{image_height_px} px"
            )));
        }
        Ok(Self {
            page_width_pt,
            page_height_pt,
            image_width_px,
            image_height_px,
        })
    }

    /// Geometry of a page rasterized at `dpi`, rounding pixel sizes up like the rasterizer does.
    pub fn from_dpi(page_width_pt: f64, page_height_pt: f64, dpi: u32) -> TimelapseResult<Self> {
        let px = |pt: f64| (pt * f64::from(dpi) / 72.0).ceil().max(0.0) as u32;
        Self::new(
            page_width_pt,
            page_height_pt,
            px(page_width_pt),
            px(page_height_pt),
        )
    }

    /// Pixels per point on each axis.
    pub fn scale(&self) -> (f64, f64) {
        (
            f64::from(self.image_width_px) / self.page_width_pt,
            f64::from(self.image_height_px) / self.page_height_pt,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn padded(self, padding: f64) -> Self {
        Self {
            left: self.left - padding,
            top: self.top - padding,
            width: self.width + 2.0 * padding,
            height: self.height + 2.0 * padding,
        }
    }
}

/// Scale a located box from points to image pixels.
pub fn to_image_space(hit: &PageHit, geometry: &PageGeometry) -> PixelBox {
    let (rx, ry) = geometry.scale();
    PixelBox {
        left: hit.h * rx,
        top: hit.v * ry,
        width: hit.width * rx,
        height: hit.height * ry,
    }
}

/// Pad a pixel box and express it as fractions of the image, clamped to the page.
pub fn normalize(
    page: u32,
    pixel_box: PixelBox,
    geometry: &PageGeometry,
    padding: f64,
) -> ChangedRegion {
    let padded = pixel_box.padded(padding);
    let w = f64::from(geometry.image_width_px);
    let h = f64::from(geometry.image_height_px);

    let left = (padded.left / w).clamp(0.0, 1.0);
    let top = (padded.top / h).clamp(0.0, 1.0);
    let right = ((padded.left + padded.width) / w).clamp(left, 1.0);
    let bottom = ((padded.top + padded.height) / h).clamp(top, 1.0);

    ChangedRegion {
        page,
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/changes/regions.rs"]
mod tests;
