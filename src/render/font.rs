// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption fonts used by the annotation renderer

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::{Path, PathBuf};
use tracing::info;

use super::RenderError;

/// Caption size in pixels
pub const CAPTION_FONT_SIZE: f32 = 50.0;

/// Measures and draws caption text
pub trait CaptionFont: Send + Sync {
    /// Width and height of `text` as drawn by [`CaptionFont::draw_text`]
    fn text_size(&self, text: &str) -> (u32, u32);

    /// Draw `text` with its top-left corner at `(x, y)`, clipped to the image
    fn draw_text(&self, image: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, text: &str);
}

/// A TrueType/OpenType font rendered at a fixed pixel scale
pub struct TrueTypeCaptionFont {
    font: FontVec,
    scale: PxScale,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for TrueTypeCaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeCaptionFont")
            .field("scale", &self.scale.y)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl TrueTypeCaptionFont {
    /// Load a font file at the caption size
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path).map_err(|e| RenderError::FontUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut font = Self::from_bytes(data).map_err(|e| match e {
            RenderError::InvalidFont(reason) => RenderError::FontUnavailable {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        font.source = Some(path.to_path_buf());
        info!("Loaded caption font from {}", path.display());
        Ok(font)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontVec::try_from_vec(data).map_err(|e| RenderError::InvalidFont(e.to_string()))?;
        Ok(Self {
            font,
            scale: PxScale::from(CAPTION_FONT_SIZE),
            source: None,
        })
    }
}

impl CaptionFont for TrueTypeCaptionFont {
    fn text_size(&self, text: &str) -> (u32, u32) {
        text_size(self.scale, &self.font, text)
    }

    fn draw_text(&self, image: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, text: &str) {
        draw_text_mut(image, color, x, y, self.scale, &self.font, text);
    }
}
