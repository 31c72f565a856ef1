pub mod assignment;
pub mod bbox;
pub mod config;
pub mod counter;
pub mod detection;
pub mod error;
pub mod predictor;
pub mod report;
pub mod scene;
pub mod tracker;

mod track;

pub use config::CounterConfig;
pub use counter::{CountingLine, CrossingCounter, Tally};
pub use detection::Detection;
pub use track::Track;

use error::Error;
use nalgebra as na;
use std::fmt;

/// Index into the configured label list
pub type ClassId = usize;

pub type TrackId = u32;

pub trait Float:
    num_traits::FromPrimitive
    + num_traits::ToPrimitive
    + na::RealField
    + Copy
    + fmt::Debug
    + PartialEq
    + 'static
{
}

impl<T> Float for T where
    T: num_traits::FromPrimitive
        + num_traits::ToPrimitive
        + na::RealField
        + Copy
        + fmt::Debug
        + PartialEq
        + 'static
{
}

/// What one processed frame produced.
#[derive(Debug, Default)]
pub struct FrameOutput {
    /// Confirmed tracks observed in this frame
    pub tracks: Vec<Track>,
    /// Ids that crossed the line for the first time in this frame
    pub newly_counted: Vec<TrackId>,
    /// Malformed detections left out of this frame
    pub rejected: Vec<Error>,
}

pub trait Counting {
    fn process(&mut self, dets: &[Detection]) -> FrameOutput;
    fn tally(&self) -> &Tally;
    fn tracks(&self) -> Vec<Track>;
}

/// Tracker and crossing counter wired together, one `process` call per frame.
pub struct LineCounter {
    scene: scene::Scene,
    counter: CrossingCounter,
    labels: Vec<String>,
}

impl LineCounter {
    pub fn new(config: &CounterConfig) -> Result<Self, Error> {
        let scene = scene::Scene::new(config)?;
        let line = CountingLine::try_from(&config.line)?;

        Ok(Self {
            scene,
            counter: CrossingCounter::new(line),
            labels: config.labels.clone(),
        })
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn line(&self) -> &CountingLine {
        self.counter.line()
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.scene.frame()
    }

    #[inline]
    pub fn summary(&self) -> report::Summary {
        report::Summary::from_tally(self.counter.tally(), &self.labels)
    }
}

impl crate::Counting for LineCounter {
    fn process(&mut self, dets: &[Detection]) -> FrameOutput {
        let tracks = self.scene.step(dets);
        let newly_counted = self.counter.count(&tracks);

        FrameOutput {
            tracks,
            newly_counted,
            rejected: self.scene.take_rejected(),
        }
    }

    #[inline]
    fn tally(&self) -> &Tally {
        self.counter.tally()
    }

    #[inline]
    fn tracks(&self) -> Vec<Track> {
        self.scene.tracks()
    }
}
