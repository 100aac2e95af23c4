//! Bounded gait/motion data collection.
//!
//! Conditions raw accelerometer and magnetometer streams through a
//! low-pass filter, change gate and moving average, dead-reckons
//! orientation from gyroscope rates, tracks the best available location
//! fix, and assembles everything into fixed-shape records inside a
//! Waiting → Measuring → Completed session that stops itself at a sample
//! or time cap. Completed sessions export as CSV.
//!
//! The accelerometer stream drives record cadence: every gate-accepted
//! accelerometer sample snapshots the latest known values of the other
//! streams. Other streams never append records, so the record rate is
//! bounded by one sensor's sampling rate.

pub mod collector;
pub mod error;
pub mod export;
pub mod filters;
pub mod location;
pub mod orientation;
pub mod sensors;
pub mod session;
pub mod status;
pub mod types;

pub use collector::Collector;
pub use error::{CollectorError, Result};
pub use session::{Profile, SessionState};
pub use types::{GeoFix, SensorRecord, Vector3, VectorSample};
