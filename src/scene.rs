use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::assignment::associate;
use crate::bbox::{BBox, Ltrb};
use crate::config::{CountedClass, CounterConfig};
use crate::error::Error;
use crate::tracker::Object;
use crate::{ClassId, Detection, Track, TrackId};

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: TrackId,
    pub object: Object,
    pub class: ClassId,
    pub current_class: ClassId,
    pub class_votes: Vec<u32>,
    pub hits_count: u32,
    pub time_since_update: u32,
}

impl Participant {
    pub fn new(id: TrackId, det: &Detection, num_classes: usize) -> Self {
        let mut class_votes = vec![0; num_classes];
        class_votes[det.class] += 1;

        Self {
            id,
            object: Object::new(&det.bbox()),
            class: det.class,
            current_class: det.class,
            class_votes,
            hits_count: 1,
            time_since_update: 0,
        }
    }

    /// Absorbs a matched detection. An observation the motion model rejected
    /// leaves the participant untouched and returns `false`.
    pub fn update(&mut self, det: &Detection) -> bool {
        if !self.object.update(self.id, &det.bbox()) {
            return false;
        }

        self.hits_count += 1;
        self.time_since_update = 0;
        self.current_class = det.class;
        self.class_votes[det.class] += 1;

        true
    }

    pub fn majority_class(&self) -> ClassId {
        let mut best = self.class;
        let mut best_votes = 0;

        for (class, &votes) in self.class_votes.iter().enumerate() {
            if votes > best_votes {
                best = class;
                best_votes = votes;
            }
        }

        best
    }

    #[inline]
    pub fn counted_class(&self, policy: CountedClass) -> ClassId {
        match policy {
            CountedClass::Majority => self.majority_class(),
            CountedClass::AtCrossing => self.current_class,
        }
    }

    #[inline]
    pub fn bbox(&self) -> BBox<Ltrb> {
        self.object.bbox()
    }

    pub fn snapshot(&self, min_hits: u32, policy: CountedClass) -> Track {
        Track {
            track_id: self.id,
            bbox: self.bbox(),
            class: self.class,
            current_class: self.current_class,
            counted_class: self.counted_class(policy),
            hits: self.hits_count,
            time_since_update: self.time_since_update,
            confirmed: self.hits_count >= min_hits,
            velocity: self.object.velocity(),
        }
    }
}

/// Owns the live track set and moves it forward one frame at a time.
pub struct Scene {
    tracks: BTreeMap<TrackId, Participant>,
    next_id: TrackId,
    frame: u64,
    iou_threshold: f32,
    max_age: u32,
    min_hits: u32,
    min_confidence: f32,
    tracked: Vec<bool>,
    counted_class: CountedClass,
    rejected: Vec<Error>,
}

impl Scene {
    pub fn new(config: &CounterConfig) -> Result<Self, Error> {
        config.validate()?;

        let mut tracked = vec![false; config.labels.len()];
        for class in config.tracked_class_ids()? {
            tracked[class] = true;
        }

        Ok(Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            frame: 0,
            iou_threshold: config.iou_threshold,
            max_age: config.max_age,
            min_hits: config.min_hits,
            min_confidence: config.min_confidence,
            tracked,
            counted_class: config.counted_class,
            rejected: Vec::new(),
        })
    }

    /// Number of frames stepped so far
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Detections rejected as malformed during the last step
    #[inline]
    pub fn rejected(&self) -> &[Error] {
        &self.rejected
    }

    #[inline]
    pub fn take_rejected(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.rejected)
    }

    fn accept<'a>(&mut self, detections: &'a [Detection]) -> Vec<&'a Detection> {
        let mut accepted = Vec::with_capacity(detections.len());

        for (index, det) in detections.iter().enumerate() {
            if let Err(reason) = det.validate(self.tracked.len()) {
                warn!(frame = self.frame, index, reason, "detection rejected");
                self.rejected
                    .push(Error::InvalidDetection { index, reason });
                continue;
            }

            if !self.tracked[det.class] || det.confidence <= self.min_confidence {
                continue;
            }

            accepted.push(det);
        }

        accepted
    }

    /// Processes one frame of detections and returns the confirmed tracks that
    /// were observed in it.
    pub fn step(&mut self, detections: &[Detection]) -> Vec<Track> {
        self.frame += 1;
        self.rejected.clear();

        let accepted = self.accept(detections);

        let mut ids = Vec::with_capacity(self.tracks.len());
        let mut predicted = Vec::with_capacity(self.tracks.len());
        let mut diverged = Vec::new();

        for (&id, t) in self.tracks.iter_mut() {
            let bbox = t.object.predict();

            if bbox.is_finite() {
                ids.push(id);
                predicted.push(bbox);
            } else {
                diverged.push(id);
            }
        }

        let det_boxes: Vec<_> = accepted.iter().map(|d| d.bbox()).collect();
        let assoc = associate(&predicted, &det_boxes, self.iou_threshold);

        trace!(
            frame = self.frame,
            tracks = predicted.len(),
            detections = det_boxes.len(),
            matched = assoc.matches.len(),
            "frame associated"
        );

        // everything above only read the track set, mutations follow

        for id in diverged {
            warn!(frame = self.frame, id, "non-finite prediction, track dropped");
            self.tracks.remove(&id);
        }

        let mut missed: Vec<TrackId> = assoc.unmatched_tracks.iter().map(|&ti| ids[ti]).collect();

        for &(ti, di, _) in &assoc.matches {
            let id = ids[ti];
            let track = self
                .tracks
                .get_mut(&id)
                .unwrap_or_else(|| panic!("matched track {} is not in the track set", id));

            if !track.update(accepted[di]) {
                missed.push(id);
            }
        }

        for id in missed {
            let track = self
                .tracks
                .get_mut(&id)
                .unwrap_or_else(|| panic!("unmatched track {} is not in the track set", id));

            track.time_since_update += 1;

            if track.time_since_update > self.max_age {
                debug!(
                    frame = self.frame,
                    id,
                    hits = track.hits_count,
                    "track evicted"
                );
                self.tracks.remove(&id);
            }
        }

        for &di in &assoc.unmatched_detections {
            let id = self.next_id;
            self.next_id += 1;

            let participant = Participant::new(id, accepted[di], self.tracked.len());
            debug!(frame = self.frame, id, class = participant.class, "track created");

            let prev = self.tracks.insert(id, participant);
            assert!(prev.is_none(), "track id {} reused", id);
        }

        self.tracks
            .values()
            .filter(|t| t.time_since_update == 0 && t.hits_count >= self.min_hits)
            .map(|t| t.snapshot(self.min_hits, self.counted_class))
            .collect()
    }

    /// Snapshot of every live track, confirmed or not
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks
            .values()
            .map(|t| t.snapshot(self.min_hits, self.counted_class))
            .collect()
    }
}
