use crate::types::Vector3;

/// Exponential (first-order low-pass) filter step.
///
/// Blends a raw sample against the previous filtered output per axis:
/// `out = last + alpha * (raw - last)`. `alpha` in (0, 1); closer to 1
/// weights the raw input more, tracking changes faster at the cost of
/// less smoothing.
pub fn low_pass(raw: Vector3, last_filtered: Vector3, alpha: f32) -> Vector3 {
    last_filtered.zip(raw, |last, current| last + alpha * (current - last))
}
