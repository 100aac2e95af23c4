use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-axis sensor vector (accelerometer m/s^2, gyroscope rad/s,
/// magnetometer uT — single precision, matching the platform event payload).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Apply `f` to each axis.
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            x: f(self.x),
            y: f(self.y),
            z: f(self.z),
        }
    }

    /// Combine two vectors axis-wise with `f`.
    pub fn zip(self, other: Vector3, f: impl Fn(f32, f32) -> f32) -> Self {
        Self {
            x: f(self.x, other.x),
            y: f(self.y, other.y),
            z: f(self.z, other.z),
        }
    }
}

/// One of the three-axis sensor streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisGroup {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

impl fmt::Display for AxisGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisGroup::Accelerometer => write!(f, "accelerometer"),
            AxisGroup::Gyroscope => write!(f, "gyroscope"),
            AxisGroup::Magnetometer => write!(f, "magnetometer"),
        }
    }
}

/// Latitude/longitude pair. `(0.0, 0.0)` doubles as the "no fix yet"
/// sentinel, so records can always carry a position column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoFix {
    pub const NONE: GeoFix = GeoFix {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn has_fix(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }
}

/// One timestamped sample from a three-axis stream. Timestamps are the
/// sensor event clock in nanoseconds; only deltas within a stream matter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VectorSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp_ns: i64,
}

impl VectorSample {
    pub fn new(x: f32, y: f32, z: f32, timestamp_ns: i64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ns,
        }
    }

    pub fn vector(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Immutable multi-sensor snapshot taken once per accepted accelerometer
/// sample during a measurement. `angle` is pitch/roll/yaw in degrees.
/// In the compact profile the gyro-derived fields stay zero.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SensorRecord {
    pub elapsed_ms: u64,
    pub accelerometer: Vector3,
    pub gyroscope: Vector3,
    pub magnetometer: Vector3,
    pub angular_velocity: Vector3,
    pub angle: Vector3,
    pub gps: GeoFix,
}
