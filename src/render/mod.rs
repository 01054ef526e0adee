// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotation renderer: bounding boxes and caption labels over an image

pub mod annotate;
pub mod font;

use std::path::PathBuf;
use thiserror::Error;

pub use annotate::{annotate, label_rect, outline_rects};
pub use font::{CaptionFont, TrueTypeCaptionFont, CAPTION_FONT_SIZE};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Caption font {path:?} unavailable: {reason}")]
    FontUnavailable { path: PathBuf, reason: String },

    #[error("Invalid font data: {0}")]
    InvalidFont(String),
}
