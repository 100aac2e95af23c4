use crate::session::SessionState;
use crate::types::{GeoFix, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Point-in-time view of a running collection, written as JSON next to
/// the session output so a dashboard or shell can poll progress.
#[derive(Serialize, Deserialize, Clone)]
pub struct CollectorStatus {
    pub timestamp: f64,
    pub state: SessionState,
    pub completed: bool,
    pub sample_count: u32,
    pub elapsed_seconds: f64,
    pub accel_samples_seen: u64,
    pub gyro_samples_seen: u64,
    pub mag_samples_seen: u64,
    pub location_fixes_seen: u64,
    pub accelerometer: Vector3,
    pub magnetometer: Vector3,
    pub angle: Vector3,
    pub gps: GeoFix,
}

impl CollectorStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            state: SessionState::Waiting,
            completed: false,
            sample_count: 0,
            elapsed_seconds: 0.0,
            accel_samples_seen: 0,
            gyro_samples_seen: 0,
            mag_samples_seen: 0,
            location_fixes_seen: 0,
            accelerometer: Vector3::ZERO,
            magnetometer: Vector3::ZERO,
            angle: Vector3::ZERO,
            gps: GeoFix::NONE,
        }
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for CollectorStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
