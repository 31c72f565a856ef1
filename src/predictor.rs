use crate::bbox::{BBox, Ltrb, Xysr};
use crate::Float;
use nalgebra as na;

const DIM_X: usize = 7;
const DIM_Z: usize = 4;

type State<F> = na::SVector<F, DIM_X>;
type StateCov<F> = na::SMatrix<F, DIM_X, DIM_X>;
type Measurement<F> = na::SVector<F, DIM_Z>;

#[inline(always)]
fn lift<F: Float>(v: f32) -> F {
    na::convert(f64::from(v))
}

#[inline(always)]
fn lower<F: Float>(v: F) -> f32 {
    v.to_f32().unwrap_or(f32::NAN)
}

fn measurement<F: Float>(bbox: &BBox<Ltrb>) -> Measurement<F> {
    let z = bbox.as_xysr();

    Measurement::new(
        lift(z.cx()),
        lift(z.cy()),
        lift(z.scale()),
        lift(z.ratio()),
    )
}

/// Constant velocity Kalman filter over `[cx, cy, s, r, vcx, vcy, vs]`,
/// where `s` is the box area and `r` its aspect ratio. The aspect ratio is
/// modelled as constant.
#[derive(Debug, Clone)]
pub struct KalmanBoxFilter<F: Float> {
    pub x: State<F>,
    pub p: StateCov<F>,
    motion: StateCov<F>,
    observation: na::SMatrix<F, DIM_Z, DIM_X>,
    process_noise: StateCov<F>,
    measurement_noise: na::SMatrix<F, DIM_Z, DIM_Z>,
}

impl<F: Float> KalmanBoxFilter<F> {
    pub fn new(bbox: &BBox<Ltrb>) -> Self {
        let mut motion = StateCov::<F>::identity();
        motion[(0, 4)] = F::one();
        motion[(1, 5)] = F::one();
        motion[(2, 6)] = F::one();

        let mut observation = na::SMatrix::<F, DIM_Z, DIM_X>::zeros();
        for i in 0..DIM_Z {
            observation[(i, i)] = F::one();
        }

        // velocities are unobserved at birth, hence the large prior
        let p = StateCov::from_diagonal(&State::from_column_slice(&[
            lift(10.0),
            lift(10.0),
            lift(10.0),
            lift(10.0),
            lift(10_000.0),
            lift(10_000.0),
            lift(10_000.0),
        ]));

        let process_noise = StateCov::from_diagonal(&State::from_column_slice(&[
            F::one(),
            F::one(),
            F::one(),
            F::one(),
            lift(0.01),
            lift(0.01),
            lift(0.0001),
        ]));

        let measurement_noise = na::SMatrix::<F, DIM_Z, DIM_Z>::from_diagonal(
            &Measurement::new(F::one(), F::one(), lift(10.0), lift(10.0)),
        );

        let z: Measurement<F> = measurement(bbox);
        let mut x = State::<F>::zeros();
        x.fixed_rows_mut::<DIM_Z>(0).copy_from(&z);

        Self {
            x,
            p,
            motion,
            observation,
            process_noise,
            measurement_noise,
        }
    }

    /// Advances the state one frame and returns the prior box.
    pub fn predict(&mut self) -> BBox<Xysr> {
        if self.x[6] + self.x[2] <= F::zero() {
            self.x[6] = F::zero();
        }

        self.x = self.motion * self.x;
        self.p = self.motion * self.p * self.motion.transpose() + self.process_noise;

        self.state()
    }

    /// Corrects the state from an observed box.
    ///
    /// Returns `false` when the innovation covariance is singular, in which case
    /// the state is left untouched.
    pub fn update(&mut self, bbox: &BBox<Ltrb>) -> bool {
        let z = measurement::<F>(bbox);
        let h = &self.observation;

        let innovation = z - h * self.x;
        let s = h * self.p * h.transpose() + self.measurement_noise;

        let Some(s_inv) = s.try_inverse() else {
            return false;
        };

        let gain = self.p * h.transpose() * s_inv;

        self.x += gain * innovation;
        self.p = (StateCov::identity() - gain * h) * self.p;

        true
    }

    #[inline]
    pub fn state(&self) -> BBox<Xysr> {
        BBox::xysr(
            lower(self.x[0]),
            lower(self.x[1]),
            lower(self.x[2]),
            lower(self.x[3]),
        )
    }

    /// Centroid velocity in px per frame
    #[inline]
    pub fn velocity(&self) -> (f32, f32) {
        (lower(self.x[4]), lower(self.x[5]))
    }
}
