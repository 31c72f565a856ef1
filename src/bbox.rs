use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-scale-ratio format, contains coordinates of the center of bbox, its area and
/// width/height ratio. This is what the motion model observes.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xysr;
impl BBoxFormat for Xysr {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], #[serde(skip)] PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox([x1, y1, x2, y2], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            self.0[0] + self.width() / 2.0,
            self.0[1] + self.height() / 2.0,
        )
    }

    /// Intersection over union. Zero for disjoint boxes and for a degenerate union.
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let iw = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let ih = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let inter = iw * ih;
        let union = self.area() + other.area() - inter;

        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    #[inline]
    pub fn as_xysr(&self) -> BBox<Xysr> {
        self.into()
    }
}

impl BBox<Xysr> {
    #[inline]
    pub fn xysr(cx: f32, cy: f32, s: f32, r: f32) -> Self {
        BBox([cx, cy, s, r], PhantomData)
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn scale(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn ratio(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xysr> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        let w = v.0[2] - v.0[0];
        let h = v.0[3] - v.0[1];

        Self(
            [v.0[0] + w / 2.0, v.0[1] + h / 2.0, w * h, w / h],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xysr>> for BBox<Ltrb> {
    // A non-positive scale yields NaN coordinates, callers check `is_finite`
    #[inline]
    fn from(v: &'a BBox<Xysr>) -> Self {
        let w = (v.0[2] * v.0[3]).sqrt();
        let h = v.0[2] / w;

        Self(
            [
                v.0[0] - w / 2.0,
                v.0[1] - h / 2.0,
                v.0[0] + w / 2.0,
                v.0[1] + h / 2.0,
            ],
            PhantomData,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BBox::ltrb(10.0, 10.0, 50.0, 30.0);

        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(20.0, 20.0, 30.0, 30.0);
        let touching = BBox::ltrb(10.0, 0.0, 20.0, 10.0);

        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&touching), 0.0);
    }

    #[test]
    fn iou_is_symmetric() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(5.0, 0.0, 15.0, 10.0);

        assert_relative_eq!(a.iou(&b), b.iou(&a));
        assert_relative_eq!(a.iou(&b), 50.0 / 150.0);
    }

    #[test]
    fn degenerate_boxes_have_zero_iou() {
        let p = BBox::ltrb(3.0, 3.0, 3.0, 3.0);

        assert_eq!(p.iou(&p), 0.0);
    }

    #[test]
    fn xysr_conversion_preserves_box() {
        let a = BBox::ltrb(100.0, 40.0, 160.0, 70.0);
        let s = a.as_xysr();

        assert_relative_eq!(s.cx(), 130.0);
        assert_relative_eq!(s.cy(), 55.0);
        assert_relative_eq!(s.scale(), 1800.0);
        assert_relative_eq!(s.ratio(), 2.0);

        let back = s.as_ltrb();
        for (x, y) in back.as_slice().iter().zip(a.as_slice()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-3);
        }
    }

    #[test]
    fn negative_scale_is_not_finite() {
        let s = BBox::xysr(10.0, 10.0, -4.0, 1.0);

        assert!(!s.as_ltrb().is_finite());
    }
}
