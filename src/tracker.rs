use crate::bbox::{BBox, Ltrb};
use crate::predictor::KalmanBoxFilter;
use tracing::warn;

/// Motion state of a single tracked object.
#[derive(Debug, Clone)]
pub struct Object {
    pub predictor: KalmanBoxFilter<f32>,
    pub updates: u32,
    prior: BBox<Ltrb>,
}

impl Object {
    pub fn new(bbox: &BBox<Ltrb>) -> Self {
        Self {
            predictor: KalmanBoxFilter::new(bbox),
            updates: 0,
            prior: *bbox,
        }
    }

    /// Steps the motion model one frame forward and returns where the object
    /// is expected to be. Nothing observed is committed here.
    #[inline]
    pub fn predict(&mut self) -> BBox<Ltrb> {
        self.prior = self.predictor.predict().as_ltrb();
        self.prior
    }

    /// Blends an observed box into the state estimate. Returns `false` when
    /// the filter could not absorb it.
    pub fn update(&mut self, id: u32, bbox: &BBox<Ltrb>) -> bool {
        if !self.predictor.update(bbox) {
            warn!(id, "singular innovation covariance, observation skipped");
            return false;
        }

        self.updates += 1;
        true
    }

    /// Last predicted box
    #[inline]
    pub fn prior(&self) -> &BBox<Ltrb> {
        &self.prior
    }

    /// Current state estimate
    #[inline]
    pub fn bbox(&self) -> BBox<Ltrb> {
        self.predictor.state().as_ltrb()
    }

    #[inline]
    pub fn velocity(&self) -> (f32, f32) {
        self.predictor.velocity()
    }
}
