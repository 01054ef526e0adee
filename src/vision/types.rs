// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Bottom-right corner, inclusive
    pub fn far_corner(&self) -> (i32, i32) {
        (self.x + self.w, self.y + self.h)
    }
}

/// One object found by the detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub rectangle: Rectangle,
    pub caption: String,
    pub confidence: f64,
}

impl DetectedObject {
    pub fn new(rectangle: Rectangle, caption: impl Into<String>) -> Self {
        Self {
            rectangle,
            caption: caption.into(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub confidence: f64,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence: 0.0,
        }
    }
}

/// Tag names joined with ", " for display; empty when there are none
pub fn tag_line(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
