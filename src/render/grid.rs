use image::{Rgba, RgbaImage, imageops};

use crate::foundation::error::{TimelapseError, TimelapseResult};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: u32,
    pub columns: u32,
}

impl GridLayout {
    pub fn new(rows: u32, columns: u32) -> TimelapseResult<Self> {
        if rows == 0 || columns == 0 {
            return Err(TimelapseError::validation(format!(
                "grid must have at least one row and column, got {rows}x{columns}"
            )));
        }
        Ok(Self { rows, columns })
    }

    pub fn cells(&self) -> usize {
        self.rows as usize * self.columns as usize
    }
}

/// Pad with blank pages the size of the first page, or drop pages that do not fit.
pub fn fit_pages(mut pages: Vec<RgbaImage>, layout: GridLayout) -> Vec<RgbaImage> {
    let cells = layout.cells();
    pages.truncate(cells);
    let (w, h) = pages.first().map(|p| p.dimensions()).unwrap_or((1, 1));
    while pages.len() < cells {
        pages.push(RgbaImage::from_pixel(w, h, WHITE));
    }
    pages
}

/// Row-major grid on white. Each column is as wide as its widest page and each row as tall as
/// its tallest page.
pub fn compose(pages: &[RgbaImage], columns: u32) -> TimelapseResult<RgbaImage> {
    if pages.is_empty() {
        return Err(TimelapseError::stage("cannot compose a frame without pages"));
    }
    let columns = (columns as usize).clamp(1, pages.len());
    let rows = pages.len().div_ceil(columns);

    let mut col_widths = vec![0u32; columns];
    let mut row_heights = vec![0u32; rows];
    for (i, page) in pages.iter().enumerate() {
        let (c, r) = (i % columns, i / columns);
        col_widths[c] = col_widths[c].max(page.width());
        row_heights[r] = row_heights[r].max(page.height());
    }

    let col_offsets = offsets(&col_widths);
    let row_offsets = offsets(&row_heights);
    let width = col_offsets[columns];
    let height = row_offsets[rows];

    let mut frame = RgbaImage::from_pixel(width, height, WHITE);
    for (i, page) in pages.iter().enumerate() {
        let x = col_offsets[i % columns];
        let y = row_offsets[i / columns];
        imageops::replace(&mut frame, page, i64::from(x), i64::from(y));
    }
    Ok(frame)
}

fn offsets(sizes: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(sizes.len() + 1);
    let mut acc = 0u32;
    out.push(acc);
    for s in sizes {
        acc = acc.saturating_add(*s);
        out.push(acc);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/grid.rs"]
mod tests;
