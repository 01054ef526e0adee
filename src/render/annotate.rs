// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use tracing::debug;

use super::font::CaptionFont;
use crate::vision::{DetectedObject, Rectangle};

pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);
pub const LABEL_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);
pub const CAPTION_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Outline thickness, drawn inward from the bounding box edge
pub const OUTLINE_WIDTH: i32 = 5;

/// Padding between the caption text and the edge of its label
pub const LABEL_MARGIN: i32 = 5;

/// Concentric rectangles forming the outline of `(x, y)-(x+w, y+h)`
/// (both corners inclusive). Rings that would collapse are dropped.
pub fn outline_rects(rect: &Rectangle) -> Vec<Rect> {
    let (x2, y2) = rect.far_corner();
    (0..OUTLINE_WIDTH)
        .filter_map(|i| {
            let (left, top) = (rect.x + i, rect.y + i);
            let width = x2 - i - left + 1;
            let height = y2 - i - top + 1;
            if width <= 0 || height <= 0 {
                return None;
            }
            Some(Rect::at(left, top).of_size(width as u32, height as u32))
        })
        .collect()
}

/// Filled label behind a caption: `(x, y)-(x+text_w+5, y+text_h+5)` inclusive
pub fn label_rect(rect: &Rectangle, text_size: (u32, u32)) -> Rect {
    let (text_w, text_h) = text_size;
    let width = text_w.saturating_add((LABEL_MARGIN + 1) as u32);
    let height = text_h.saturating_add((LABEL_MARGIN + 1) as u32);
    Rect::at(rect.x, rect.y).of_size(width, height)
}

/// Draw every detection onto `image` in order: outline, caption label,
/// caption text. Later objects paint over earlier ones; anything outside
/// the image is clipped.
pub fn annotate(image: &mut RgbaImage, objects: &[DetectedObject], font: &dyn CaptionFont) {
    for object in objects {
        let rect = &object.rectangle;

        for ring in outline_rects(rect) {
            draw_hollow_rect_mut(image, ring, OUTLINE_COLOR);
        }

        let text_size = font.text_size(&object.caption);
        draw_filled_rect_mut(image, label_rect(rect, text_size), LABEL_COLOR);
        font.draw_text(image, CAPTION_COLOR, rect.x, rect.y, &object.caption);

        debug!(
            "Annotated {:?} at ({}, {}) {}x{}",
            object.caption, rect.x, rect.y, rect.w, rect.h
        );
    }
}
