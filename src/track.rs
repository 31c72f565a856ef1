use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::{ClassId, TrackId};

/// Frame-local snapshot of a live track, detached from the track set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: TrackId,
    pub bbox: BBox<Ltrb>,

    // class of the detection that started the track, never changes
    pub class: ClassId,

    // class of the latest matched detection
    pub current_class: ClassId,

    // class this track is tallied under if it crosses now
    pub counted_class: ClassId,

    pub hits: u32,
    pub time_since_update: u32,
    pub confirmed: bool,

    // in px per frame
    pub velocity: (f32, f32),
}

impl Track {
    #[inline]
    pub fn centroid(&self) -> nalgebra::Point2<f32> {
        self.bbox.center()
    }
}
