use std::collections::{BTreeMap, BTreeSet};

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LineConfig;
use crate::error::Error;
use crate::{ClassId, Track, TrackId};

/// Segment with a tolerance band on both sides of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountingLine {
    start: na::Point2<f32>,
    end: na::Point2<f32>,
    tolerance: f32,
}

impl CountingLine {
    pub fn new(start: na::Point2<f32>, end: na::Point2<f32>, tolerance: f32) -> Result<Self, Error> {
        if !(start.coords.iter().chain(end.coords.iter()).all(|v| v.is_finite())) {
            return Err(Error::InvalidConfig("line endpoints must be finite".into()));
        }

        if na::distance_squared(&start, &end) <= f32::EPSILON {
            return Err(Error::InvalidConfig("line endpoints coincide".into()));
        }

        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "line tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }

        Ok(Self {
            start,
            end,
            tolerance,
        })
    }

    #[inline]
    pub fn start(&self) -> na::Point2<f32> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> na::Point2<f32> {
        self.end
    }

    #[inline]
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Whether `p` projects strictly inside the segment and lies strictly
    /// closer than `tolerance` to it.
    pub fn in_band(&self, p: &na::Point2<f32>) -> bool {
        let dir = self.end - self.start;
        let rel = p - self.start;
        let len = dir.norm();

        let along = rel.dot(&dir) / (len * len);
        let across = (dir.x * rel.y - dir.y * rel.x).abs() / len;

        along > 0.0 && along < 1.0 && across < self.tolerance
    }
}

impl TryFrom<&LineConfig> for CountingLine {
    type Error = Error;

    fn try_from(cfg: &LineConfig) -> Result<Self, Error> {
        CountingLine::new(
            na::Point2::new(cfg.start[0], cfg.start[1]),
            na::Point2::new(cfg.end[0], cfg.end[1]),
            cfg.tolerance,
        )
    }
}

/// Per-class counts plus the identities already counted.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Tally {
    counts: BTreeMap<ClassId, u32>,
    counted: BTreeSet<TrackId>,
    order: Vec<TrackId>,
    classes: Vec<ClassId>,
}

impl Tally {
    /// Counts `id` under `class` unless it was counted before.
    pub fn record(&mut self, id: TrackId, class: ClassId) -> bool {
        if !self.counted.insert(id) {
            return false;
        }

        self.order.push(id);

        let n = self.counts.entry(class).or_insert(0);
        if *n == 0 {
            self.classes.push(class);
        }
        *n += 1;

        true
    }

    #[inline]
    pub fn count(&self, class: ClassId) -> u32 {
        self.counts.get(&class).copied().unwrap_or(0)
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_counted(&self, id: TrackId) -> bool {
        self.counted.contains(&id)
    }

    /// Counted identities in the order they crossed
    #[inline]
    pub fn counted_ids(&self) -> &[TrackId] {
        &self.order
    }

    /// Classes with at least one count, in the order they were first counted
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, u32)> + '_ {
        self.classes.iter().map(move |&c| (c, self.count(c)))
    }
}

pub struct CrossingCounter {
    line: CountingLine,
    tally: Tally,
}

impl CrossingCounter {
    pub fn new(line: CountingLine) -> Self {
        Self {
            line,
            tally: Tally::default(),
        }
    }

    #[inline]
    pub fn line(&self) -> &CountingLine {
        &self.line
    }

    #[inline]
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Counts confirmed tracks whose centroid is in the band for the first
    /// time and returns their ids.
    pub fn count(&mut self, tracks: &[Track]) -> Vec<TrackId> {
        let mut newly = Vec::new();

        for t in tracks {
            if !t.confirmed || self.tally.is_counted(t.track_id) {
                continue;
            }

            let c = t.centroid();
            if self.line.in_band(&c) && self.tally.record(t.track_id, t.counted_class) {
                debug!(
                    id = t.track_id,
                    class = t.counted_class,
                    cx = c.x,
                    cy = c.y,
                    total = self.tally.total(),
                    "line crossed"
                );
                newly.push(t.track_id);
            }
        }

        newly
    }
}
