use crate::types::Vector3;

/// Orientation estimate from gyroscope dead-reckoning.
///
/// Integrates angular rate over elapsed time into pitch/roll/yaw Euler
/// angles (rectangular integration). The first sample after a reset only
/// establishes the time baseline and produces no angle change. This is
/// open-loop: with no accelerometer or magnetometer correction the error
/// grows without bound over long measurements, which is acceptable for
/// the bounded sessions collected here.
pub struct OrientationIntegrator {
    pitch: f64,
    roll: f64,
    yaw: f64,
    last_timestamp_ns: Option<i64>,
    last_rate: Vector3,
}

impl OrientationIntegrator {
    pub fn new() -> Self {
        OrientationIntegrator {
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
            last_timestamp_ns: None,
            last_rate: Vector3::ZERO,
        }
    }

    /// Accumulate one gyroscope sample. `timestamp_ns` is the sensor event
    /// clock; samples must arrive in order within the stream.
    ///
    /// Axis mapping: the device is carried upright, so the Y rate drives
    /// pitch and the X rate drives roll. Downstream consumers depend on
    /// this mapping; see the tests before changing it.
    pub fn integrate(&mut self, gyro: Vector3, timestamp_ns: i64) {
        self.last_rate = gyro;

        let last = match self.last_timestamp_ns {
            Some(t) => t,
            None => {
                self.last_timestamp_ns = Some(timestamp_ns);
                return;
            }
        };

        let dt = (timestamp_ns - last) as f64 * 1e-9;
        if dt <= 0.0 {
            return;
        }
        self.last_timestamp_ns = Some(timestamp_ns);

        self.pitch += gyro.y as f64 * dt;
        self.roll += gyro.x as f64 * dt;
        self.yaw += gyro.z as f64 * dt;
    }

    /// Current pitch/roll/yaw in degrees.
    pub fn angles_deg(&self) -> Vector3 {
        Vector3::new(
            self.pitch.to_degrees() as f32,
            self.roll.to_degrees() as f32,
            self.yaw.to_degrees() as f32,
        )
    }

    /// Raw angular rate from the most recent sample, unfiltered.
    pub fn angular_velocity(&self) -> Vector3 {
        self.last_rate
    }

    /// Zero the angles and drop the time baseline for a fresh measurement.
    pub fn reset(&mut self) {
        self.pitch = 0.0;
        self.roll = 0.0;
        self.yaw = 0.0;
        self.last_timestamp_ns = None;
        self.last_rate = Vector3::ZERO;
    }
}

impl Default for OrientationIntegrator {
    fn default() -> Self {
        Self::new()
    }
}
