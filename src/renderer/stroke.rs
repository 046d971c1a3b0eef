//! CPU stroke rasterization
//!
//! A polyline is drawn as a chain of capsules. Each capsule only touches the
//! pixels inside its padded bounding box, so cost scales with stroke length
//! rather than canvas area.

use glam::Vec2;
use image::{GrayImage, Luma};

use crate::sim::sdf::sd_capsule;

/// Ink and paper for the judge artifact
pub const INK: Luma<u8> = Luma([0]);
pub const PAPER: Luma<u8> = Luma([255]);

/// Visit every pixel whose center lies inside the capsule `a..b`
pub fn for_each_capsule_pixel<F>(width: u32, height: u32, a: Vec2, b: Vec2, half_width: f32, mut plot: F)
where
    F: FnMut(u32, u32),
{
    if width == 0 || height == 0 {
        return;
    }
    let min = a.min(b) - Vec2::splat(half_width + 1.0);
    let max = a.max(b) + Vec2::splat(half_width + 1.0);

    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(width - 1);
    let y1 = (max.y.ceil().max(0.0) as u32).min(height - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }

    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if sd_capsule(center, a, b, half_width) <= 0.0 {
                plot(x, y);
            }
        }
    }
}

/// Visit every pixel covered by a polyline stroke with round caps and joins
pub fn for_each_stroke_pixel<F>(width: u32, height: u32, points: &[Vec2], stroke_width: f32, mut plot: F)
where
    F: FnMut(u32, u32),
{
    let half = stroke_width * 0.5;
    match points {
        [] => {}
        [single] => for_each_capsule_pixel(width, height, *single, *single, half, &mut plot),
        _ => {
            for w in points.windows(2) {
                for_each_capsule_pixel(width, height, w[0], w[1], half, &mut plot);
            }
        }
    }
}

/// Render a path as black ink on a white square canvas
pub fn rasterize_stroke(canvas_size: u32, points: &[Vec2], stroke_width: f32) -> GrayImage {
    let mut image = GrayImage::from_pixel(canvas_size, canvas_size, PAPER);
    for_each_stroke_pixel(canvas_size, canvas_size, points, stroke_width, |x, y| {
        image.put_pixel(x, y, INK);
    });
    image
}

/// Count ink pixels (luma below the midpoint)
pub fn ink_pixel_count(image: &GrayImage) -> usize {
    image.pixels().filter(|p| p.0[0] < 128).count()
}
