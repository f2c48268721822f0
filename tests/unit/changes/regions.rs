use super::*;

fn letter_at_144_dpi() -> PageGeometry {
    PageGeometry::from_dpi(612.0, 792.0, 144).unwrap()
}

fn hit(h: f64, v: f64, width: f64, height: f64) -> PageHit {
    PageHit {
        page: 1,
        x: h,
        y: v,
        h,
        v,
        width,
        height,
    }
}

#[test]
fn from_dpi_matches_rasterizer_size() {
    let g = letter_at_144_dpi();
    assert_eq!((g.image_width_px, g.image_height_px), (1224, 1584));
    assert_eq!(g.scale(), (2.0, 2.0));
}

#[test]
fn box_scales_per_axis() {
    let g = letter_at_144_dpi();
    let b = to_image_space(&hit(100.0, 100.0, 50.0, 20.0), &g);
    assert_eq!(
        b,
        PixelBox {
            left: 200.0,
            top: 200.0,
            width: 100.0,
            height: 40.0,
        }
    );

    let squashed = PageGeometry::new(612.0, 792.0, 612, 1584).unwrap();
    let b = to_image_space(&hit(100.0, 100.0, 50.0, 20.0), &squashed);
    assert_eq!((b.left, b.top, b.width, b.height), (100.0, 200.0, 50.0, 40.0));
}

#[test]
fn normalize_applies_padding_then_fractions() {
    let g = PageGeometry::new(100.0, 100.0, 1000, 1000).unwrap();
    let region = normalize(
        2,
        PixelBox {
            left: 100.0,
            top: 200.0,
            width: 300.0,
            height: 100.0,
        },
        &g,
        25.0,
    );
    assert_eq!(region.page, 2);
    assert!((region.x - 0.075).abs() < 1e-9);
    assert!((region.y - 0.175).abs() < 1e-9);
    assert!((region.width - 0.35).abs() < 1e-9);
    assert!((region.height - 0.15).abs() < 1e-9);
}

#[test]
fn normalize_clamps_to_page() {
    let g = PageGeometry::new(100.0, 100.0, 100, 100).unwrap();
    let region = normalize(
        1,
        PixelBox {
            left: -10.0,
            top: 90.0,
            width: 200.0,
            height: 50.0,
        },
        &g,
        0.0,
    );
    assert_eq!(region.x, 0.0);
    assert_eq!(region.width, 1.0);
    assert_eq!(region.y, 0.9);
    assert!((region.y + region.height - 1.0).abs() < 1e-9);
}

#[test]
fn degenerate_geometry_is_rejected() {
    assert!(PageGeometry::new(0.0, 792.0, 10, 10).is_err());
    assert!(PageGeometry::new(612.0, 792.0, 0, 10).is_err());
}
