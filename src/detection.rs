use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::ClassId;

/// Contains the (x1,y1) left-top and (x2,y2) right-bottom corners of a detected box
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: ClassId,
}

impl Detection {
    #[inline]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class: ClassId) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class,
        }
    }

    #[inline(always)]
    pub fn bbox(&self) -> BBox<Ltrb> {
        BBox::ltrb(self.x1, self.y1, self.x2, self.y2)
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox().iou(&other.bbox())
    }

    /// Checks the detection is usable as a motion model observation.
    ///
    /// `num_classes` is the length of the label list classes index into.
    pub fn validate(&self, num_classes: usize) -> Result<(), &'static str> {
        if !self.bbox().is_finite() {
            return Err("non-finite coordinates");
        }

        if self.x2 < self.x1 || self.y2 < self.y1 {
            return Err("inverted box corners");
        }

        if self.x2 == self.x1 || self.y2 == self.y1 {
            return Err("box has no area");
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err("confidence outside [0, 1]");
        }

        if self.class >= num_classes {
            return Err("class index outside the label list");
        }

        Ok(())
    }
}
