//! COCO format data structures
//!
//! Records are typed, but every field the cleaner does not interpret is carried
//! through `extra` so a rewritten file keeps what the input had for retained records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CleanError, Result};

/// COCO category information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Image {
    pub fn new(id: i64, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            width: Some(width),
            height: Some(height),
            extra: Map::new(),
        }
    }

    /// Width and height in pixels, both required and non-zero.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
            (Some(_), Some(_)) => Err(CleanError::malformed(
                "image",
                self.id,
                "width and height must be non-zero",
            )),
            _ => Err(CleanError::malformed(
                "image",
                self.id,
                "missing width or height",
            )),
        }
    }
}

/// Axis-aligned box in COCO's `[x, y, width, height]` pixel layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bbox {
    /// A box is degenerate when either side is zero or negative.
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// True if the box leaves the `width` x `height` canvas on any side.
    pub fn exceeds(&self, width: u32, height: u32) -> bool {
        self.x < 0.0
            || self.y < 0.0
            || self.x + self.w > width as f64
            || self.y + self.h > height as f64
    }
}

/// COCO annotation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    pub image_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub bbox: Vec<f64>, // [x, y, width, height]
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotation {
    pub fn new(id: i64, image_id: i64, category_id: i64, bbox: [f64; 4]) -> Self {
        Self {
            id,
            image_id,
            category_id: Some(category_id),
            bbox: bbox.to_vec(),
            extra: Map::new(),
        }
    }

    /// The typed box. Fails if the stored `bbox` is not exactly four numbers.
    pub fn bbox(&self) -> Result<Bbox> {
        match self.bbox.as_slice() {
            &[x, y, w, h] => Ok(Bbox { x, y, w, h }),
            other => Err(CleanError::malformed(
                "annotation",
                self.id,
                format!("bbox has {} values, expected 4", other.len()),
            )),
        }
    }

    pub fn has_degenerate_bbox(&self) -> Result<bool> {
        Ok(self.bbox()?.is_degenerate())
    }

    pub fn category(&self) -> Result<i64> {
        self.category_id
            .ok_or_else(|| CleanError::malformed("annotation", self.id, "missing category_id"))
    }
}

/// The three record sets of a COCO document.
///
/// Missing top-level keys default to empty sets. `info`, `licenses` and any other
/// top-level keys are not modelled and are dropped on rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl CocoDataset {
    pub fn new(images: Vec<Image>, annotations: Vec<Annotation>, categories: Vec<Category>) -> Self {
        Self {
            images,
            annotations,
            categories,
        }
    }

    /// Look up an image by id. Builds no index; use for single lookups only.
    pub fn image(&self, id: i64) -> Option<&Image> {
        self.images.iter().find(|image| image.id == id)
    }
}
