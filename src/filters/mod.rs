pub mod low_pass;
pub mod moving_average;
pub mod threshold;

pub use low_pass::low_pass;
pub use moving_average::VectorAverager;
pub use threshold::gate;

use crate::types::Vector3;

/// Tuning for one axis-group's conditioning chain.
#[derive(Debug, Clone, Copy)]
pub struct FilterParams {
    /// Low-pass blend factor in (0, 1).
    pub alpha: f32,
    /// Per-axis change required for the gate to accept a sample.
    pub threshold: f32,
    /// Moving-average window capacity.
    pub buffer_size: usize,
}

impl FilterParams {
    pub fn accelerometer() -> Self {
        FilterParams {
            alpha: 0.8,
            threshold: 0.2,
            buffer_size: 10,
        }
    }

    pub fn magnetometer() -> Self {
        FilterParams {
            alpha: 0.8,
            threshold: 0.7,
            buffer_size: 10,
        }
    }
}

/// Low-pass → threshold gate → moving average, with the per-stream state
/// the chain needs between samples.
///
/// The low-pass state advances on every sample, accepted or not, so the
/// filter keeps tracking slow drift; the gate reference only moves on
/// acceptance. Collapsing the two states into one would let a plateau
/// just past the reference re-trigger forever.
pub struct SignalChain {
    params: FilterParams,
    last_filtered: Vector3,
    last_accepted: Vector3,
    averager: VectorAverager,
}

impl SignalChain {
    pub fn new(params: FilterParams) -> Self {
        SignalChain {
            params,
            last_filtered: Vector3::ZERO,
            last_accepted: Vector3::ZERO,
            averager: VectorAverager::new(params.buffer_size),
        }
    }

    /// Run one raw sample through the chain. Returns the smoothed vector
    /// when the gate accepts, `None` when the change was jitter.
    pub fn process(&mut self, raw: Vector3) -> Option<Vector3> {
        let filtered = low_pass(raw, self.last_filtered, self.params.alpha);
        self.last_filtered = filtered;

        match gate(filtered, self.last_accepted, self.params.threshold) {
            Some(accepted) => {
                self.last_accepted = accepted;
                Some(self.averager.push(accepted))
            }
            None => None,
        }
    }

    /// Re-seed the chain for a fresh measurement.
    pub fn reset(&mut self) {
        self.last_filtered = Vector3::ZERO;
        self.last_accepted = Vector3::ZERO;
        self.averager.clear();
    }

    pub fn last_accepted(&self) -> Vector3 {
        self.last_accepted
    }
}
