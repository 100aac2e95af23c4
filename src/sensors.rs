use crate::error::{CollectorError, Result};
use crate::location::LocationReport;
use crate::session::Profile;
use crate::types::{AxisGroup, VectorSample};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Which three-axis sensors the device actually has. `start()` refuses to
/// run when a profile needs a sensor that is absent.
#[derive(Debug, Clone, Copy)]
pub struct SensorInventory {
    pub accelerometer: bool,
    pub gyroscope: bool,
    pub magnetometer: bool,
}

impl SensorInventory {
    pub fn full() -> Self {
        SensorInventory {
            accelerometer: true,
            gyroscope: true,
            magnetometer: true,
        }
    }

    pub fn without_gyroscope() -> Self {
        SensorInventory {
            gyroscope: false,
            ..Self::full()
        }
    }

    pub fn has(&self, group: AxisGroup) -> bool {
        match group {
            AxisGroup::Accelerometer => self.accelerometer,
            AxisGroup::Gyroscope => self.gyroscope,
            AxisGroup::Magnetometer => self.magnetometer,
        }
    }
}

/// Receiving ends of the per-source channels. Order is FIFO within each
/// stream; nothing orders one stream against another.
#[derive(Debug)]
pub struct SensorStreams {
    pub accel: Receiver<VectorSample>,
    pub gyro: Option<Receiver<VectorSample>>,
    pub mag: Receiver<VectorSample>,
    pub location: Receiver<LocationReport>,
}

/// Running producer tasks for one measurement. Every exit path must call
/// `shutdown()` so the subscription actually ends.
#[derive(Debug)]
pub struct SensorRig {
    handles: Vec<JoinHandle<()>>,
}

impl SensorRig {
    /// Subscribe to all sources the profile needs. Fails with
    /// `MissingSensor` before anything spawns when the inventory lacks a
    /// required sensor.
    pub fn subscribe(
        profile: &Profile,
        inventory: &SensorInventory,
    ) -> Result<(SensorRig, SensorStreams)> {
        if !inventory.accelerometer {
            return Err(CollectorError::MissingSensor(AxisGroup::Accelerometer));
        }
        if !inventory.magnetometer {
            return Err(CollectorError::MissingSensor(AxisGroup::Magnetometer));
        }
        if profile.include_orientation && !inventory.gyroscope {
            return Err(CollectorError::MissingSensor(AxisGroup::Gyroscope));
        }

        let period = Duration::from_secs_f32(1.0 / profile.sample_rate_hz);
        let (accel_tx, accel_rx) = channel::<VectorSample>(500);
        let (mag_tx, mag_rx) = channel::<VectorSample>(500);
        let (location_tx, location_rx) = channel::<LocationReport>(100);

        let mut handles = vec![
            tokio::spawn(accel_loop(accel_tx, period)),
            tokio::spawn(mag_loop(mag_tx, period)),
            tokio::spawn(location_loop(location_tx)),
        ];

        let gyro = if profile.include_orientation {
            let (gyro_tx, gyro_rx) = channel::<VectorSample>(500);
            handles.push(tokio::spawn(gyro_loop(gyro_tx, period)));
            Some(gyro_rx)
        } else {
            None
        };

        log::info!(
            "subscribed to sensor sources at {:.0} Hz",
            profile.sample_rate_hz
        );
        Ok((
            SensorRig { handles },
            SensorStreams {
                accel: accel_rx,
                gyro,
                mag: mag_rx,
                location: location_rx,
            },
        ))
    }

    /// Unsubscribe: abort every producer task.
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        log::info!("sensor sources unsubscribed");
    }
}

/// Last-known reports from every location provider, for seeding the fix
/// before the first live update arrives.
pub fn last_known_reports() -> Vec<LocationReport> {
    ["gps", "network"]
        .iter()
        .filter_map(|provider| last_known(provider))
        .collect()
}

/// Pull one provider's cached position, if it has one.
pub fn last_known(provider: &str) -> Option<LocationReport> {
    match provider {
        "gps" => Some(simulated_location(0)),
        "network" => {
            let mut report = simulated_location(0);
            report.provider = "network".to_string();
            report.accuracy = 25.0;
            Some(report)
        }
        _ => None,
    }
}

async fn accel_loop(tx: Sender<VectorSample>, period: Duration) {
    let mut ticker = interval(period);
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;

        match tx.try_send(simulated_accel()) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[accel] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[accel] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Consumer is behind; drop this sample
            }
        }
    }
}

async fn gyro_loop(tx: Sender<VectorSample>, period: Duration) {
    let mut ticker = interval(period);
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;

        match tx.try_send(simulated_gyro()) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[gyro] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[gyro] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

async fn mag_loop(tx: Sender<VectorSample>, period: Duration) {
    let mut ticker = interval(period);
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;

        match tx.try_send(simulated_mag()) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[mag] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[mag] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

async fn location_loop(tx: Sender<LocationReport>) {
    let mut ticker = interval(Duration::from_secs(1));
    let mut fix_count = 0u64;

    loop {
        ticker.tick().await;

        match tx.try_send(simulated_location(fix_count)) {
            Ok(_) => {
                fix_count += 1;
                log::debug!("[location] {} fixes", fix_count);
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[location] channel closed after {} fixes", fix_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

fn event_timestamp_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

/// Walking-gait stand-in: gravity on z plus a ~2 Hz step oscillation
/// strong enough to clear the accelerometer gate.
fn simulated_accel() -> VectorSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f32 * 0.02;

    VectorSample::new(
        (t * 4.0 * PI).sin() * 1.5,
        (t * 4.0 * PI).cos() * 0.8,
        9.81 + (t * 2.0 * PI).sin() * 1.2,
        event_timestamp_ns(),
    )
}

fn simulated_gyro() -> VectorSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f32 * 0.02;

    VectorSample::new(
        (t * 0.5).sin() * 0.2,
        (t * 0.3).cos() * 0.15,
        (t * 1.0).sin() * 0.4,
        event_timestamp_ns(),
    )
}

fn simulated_mag() -> VectorSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f32 * 0.02;

    VectorSample::new(
        30.0 + (t * 0.8).sin() * 6.0,
        -12.0 + (t * 0.8).cos() * 6.0,
        42.0 + (t * 0.4).sin() * 2.0,
        event_timestamp_ns(),
    )
}

fn simulated_location(seq: u64) -> LocationReport {
    let drift = seq as f64 * 0.00001;
    LocationReport::new(
        "gps",
        37.4563 + drift,
        126.7052 + drift,
        5.0 + ((seq as f32) * 0.1).sin() * 2.0,
    )
}
