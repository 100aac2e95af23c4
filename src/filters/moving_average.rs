use crate::types::Vector3;
use std::collections::VecDeque;

/// Moving-average smoother over accepted sensor vectors.
///
/// Keeps the last `capacity` vectors in a FIFO window and returns their
/// unweighted per-axis mean. The window only ever sees gate-accepted
/// samples, so the mean reacts to genuine motion rather than jitter.
pub struct VectorAverager {
    window: VecDeque<Vector3>,
    capacity: usize,
}

impl VectorAverager {
    pub fn new(capacity: usize) -> Self {
        VectorAverager {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push an accepted vector, evicting the oldest entry when the window
    /// is full, and return the current per-axis mean.
    pub fn push(&mut self, accepted: Vector3) -> Vector3 {
        self.window.push_back(accepted);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.mean()
    }

    /// Per-axis mean of the buffered vectors. Never called on an empty
    /// window in practice since `push` includes the new element.
    pub fn mean(&self) -> Vector3 {
        if self.window.is_empty() {
            return Vector3::ZERO;
        }
        let sum = self
            .window
            .iter()
            .fold(Vector3::ZERO, |acc, v| acc.zip(*v, |a, b| a + b));
        let n = self.window.len() as f32;
        sum.map(|component| component / n)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
