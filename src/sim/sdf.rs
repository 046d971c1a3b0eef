//! Signed distance helpers for stroke geometry
//!
//! The rasterizer and the preview both shade a pixel by its distance to a
//! shape, so caps and joins come out round without extra work.

use glam::Vec2;

/// Signed distance to a circle outline's disc
#[inline]
pub fn sd_circle(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Unsigned distance to a circle outline (ring of zero width)
#[inline]
pub fn sd_ring(p: Vec2, center: Vec2, radius: f32) -> f32 {
    sd_circle(p, center, radius).abs()
}

/// Distance from `p` to the segment `a..b`
///
/// Degenerate segments (a == b) collapse to point distance, which gives a
/// round dot for a click without motion.
pub fn sd_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

/// Signed distance to a capsule (segment thickened by `half_width`)
#[inline]
pub fn sd_capsule(p: Vec2, a: Vec2, b: Vec2, half_width: f32) -> f32 {
    sd_segment(p, a, b) - half_width
}
