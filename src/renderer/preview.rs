//! On-screen preview frame
//!
//! Target outline (dashed) plus the stroke in progress, in theme colors.
//! Never sent to the judge.

use glam::Vec2;
use image::{Rgba, RgbaImage};

use super::stroke::for_each_stroke_pixel;
use crate::settings::Theme;
use crate::sim::sdf::sd_ring;
use crate::sim::target::TargetCircle;

/// Render the preview for one frame
pub fn render_preview(
    canvas_size: u32,
    target: Option<&TargetCircle>,
    path: &[Vec2],
    theme: &Theme,
) -> RgbaImage {
    let mut frame = RgbaImage::from_pixel(canvas_size, canvas_size, Rgba(theme.background));

    if let Some(target) = target {
        draw_dashed_ring(&mut frame, target, theme);
    }

    // A single sample is not a line yet
    if path.len() > 1 {
        let color = Rgba(theme.stroke);
        for_each_stroke_pixel(canvas_size, canvas_size, path, theme.stroke_width, |x, y| {
            blend(&mut frame, x, y, color);
        });
    }

    frame
}

fn draw_dashed_ring(frame: &mut RgbaImage, target: &TargetCircle, theme: &Theme) {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 || target.radius == 0 {
        return;
    }
    let center = target.center();
    let radius = target.radius as f32;
    let half = theme.target_line_width * 0.5;
    let period = theme.dash_length + theme.gap_length;
    let color = Rgba(theme.target);

    let reach = radius + half + 1.0;
    let x0 = (center.x - reach).floor().max(0.0) as u32;
    let y0 = (center.y - reach).floor().max(0.0) as u32;
    let x1 = ((center.x + reach).ceil().max(0.0) as u32).min(width - 1);
    let y1 = ((center.y + reach).ceil().max(0.0) as u32).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if sd_ring(p, center, radius) > half {
                continue;
            }
            if period > 0.0 {
                // Arc length from angle 0, clockwise in screen space
                let theta = (p.y - center.y).atan2(p.x - center.x).rem_euclid(std::f32::consts::TAU);
                let along = (theta * radius).rem_euclid(period);
                if along >= theme.dash_length {
                    continue;
                }
            }
            blend(frame, x, y, color);
        }
    }
}

/// Source-over blend of a straight-alpha color
fn blend(frame: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) {
    let dst = frame.get_pixel_mut(x, y);
    let alpha = color.0[3] as u32;
    if alpha == 255 {
        *dst = color;
        return;
    }
    for c in 0..3 {
        let src = color.0[c] as u32;
        let old = dst.0[c] as u32;
        dst.0[c] = ((src * alpha + old * (255 - alpha)) / 255) as u8;
    }
    dst.0[3] = dst.0[3].max(color.0[3]);
}
