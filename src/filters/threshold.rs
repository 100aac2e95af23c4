use crate::types::Vector3;

/// Change gate over filtered samples.
///
/// Accepts `filtered` iff at least one axis moved more than `threshold`
/// away from the last accepted value; small jitter on all axes is
/// suppressed. Callers must keep advancing their low-pass state even on
/// rejection — the gate only withholds the accepted reference.
pub fn gate(filtered: Vector3, last_accepted: Vector3, threshold: f32) -> Option<Vector3> {
    let delta = filtered.zip(last_accepted, |a, b| (a - b).abs());
    if delta.x > threshold || delta.y > threshold || delta.z > threshold {
        Some(filtered)
    } else {
        None
    }
}
