use image::{Rgba, RgbaImage};

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Straight (non-premultiplied) RGBA8.
pub type Rgba8 = [u8; 4];

/// Weak tint over every page that has at least one change.
pub const PAGE_TINT: Rgba8 = [0xA3, 0xBE, 0x8C, 0x44];
/// Stronger tint over each changed box.
pub const BOX_TINT: Rgba8 = [0x81, 0xA1, 0xC1, 0x44];

/// Source-over for straight alpha.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255 - sa;
    let da = mul_div255(u16::from(dst[3]), inv);
    let out_a = sa + u16::from(da);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = u32::from(src[i]) * u32::from(sa);
        let dc = u32::from(dst[i]) * u32::from(da);
        out[i] = ((sc + dc + u32::from(out_a) / 2) / u32::from(out_a)).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    out
}

/// Composite `overlay` onto `base` in place. Both images must have the same size.
pub fn over_in_place(base: &mut RgbaImage, overlay: &RgbaImage) -> TimelapseResult<()> {
    if base.dimensions() != overlay.dimensions() {
        return Err(TimelapseError::stage(format!(
            "overlay is {:?} but page is {:?}",
            overlay.dimensions(),
            base.dimensions()
        )));
    }
    for (d, s) in base.pixels_mut().zip(overlay.pixels()) {
        *d = Rgba(over(d.0, s.0));
    }
    Ok(())
}

/// Set every pixel of the rectangle to `color`, clipped to the image.
pub fn fill_rect(img: &mut RgbaImage, left: u32, top: u32, width: u32, height: u32, color: Rgba8) {
    let right = left.saturating_add(width).min(img.width());
    let bottom = top.saturating_add(height).min(img.height());
    for y in top..bottom {
        for x in left..right {
            img.put_pixel(x, y, Rgba(color));
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
