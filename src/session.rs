use crate::filters::FilterParams;
use crate::types::SensorRecord;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created or reset, no data accrual
    Waiting,
    /// Accrual active, records appended per accepted accelerometer sample
    Measuring,
    /// Caps reached or measurement stopped; data frozen for export
    Completed,
}

/// Capture profile: which fields a record carries, the session caps, and
/// the conditioning parameters for the filtered streams.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Record gyroscope, angular velocity and integrated angles.
    pub include_orientation: bool,
    /// Stop after this many records, if set.
    pub sample_cap: Option<u32>,
    /// Stop once the session has run this long.
    pub duration_cap: Duration,
    pub accel_params: FilterParams,
    pub mag_params: FilterParams,
    /// Nominal registration rate for the motion sensors.
    pub sample_rate_hz: f32,
}

impl Profile {
    /// Accelerometer + magnetometer + position, capped at 500 records or
    /// 20 seconds, whichever comes first.
    pub fn compact() -> Self {
        Profile {
            include_orientation: false,
            sample_cap: Some(500),
            duration_cap: Duration::from_secs(20),
            accel_params: FilterParams::accelerometer(),
            mag_params: FilterParams::magnetometer(),
            sample_rate_hz: 50.0,
        }
    }

    /// All sensor fields including integrated orientation, time-capped at
    /// 30 seconds with no record cap.
    pub fn extended() -> Self {
        Profile {
            include_orientation: true,
            sample_cap: None,
            duration_cap: Duration::from_secs(30),
            accel_params: FilterParams::accelerometer(),
            mag_params: FilterParams::magnetometer(),
            sample_rate_hz: 50.0,
        }
    }
}

/// One bounded measurement: the state machine plus the append-only record
/// list and its delimited-row mirror.
pub struct Session {
    state: SessionState,
    sample_cap: Option<u32>,
    duration_cap: Duration,
    started_at: Option<Instant>,
    start_time: Option<String>,
    records: Vec<SensorRecord>,
    rows: Vec<Vec<String>>,
    sample_count: u32,
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: SessionState::Waiting,
            sample_cap: None,
            duration_cap: Duration::ZERO,
            started_at: None,
            start_time: None,
            records: Vec::new(),
            rows: Vec::new(),
            sample_count: 0,
        }
    }

    /// Waiting → Measuring. Clears any prior data, fixes the header row,
    /// and starts the elapsed clock.
    pub fn begin(&mut self, profile: &Profile, header: Vec<String>) {
        self.state = SessionState::Measuring;
        self.sample_cap = profile.sample_cap;
        self.duration_cap = profile.duration_cap;
        self.started_at = Some(Instant::now());
        self.start_time = Some(Utc::now().to_rfc3339());
        self.records.clear();
        self.rows.clear();
        self.rows.push(header);
        self.sample_count = 0;
    }

    /// Append one record and its encoded row, then evaluate the caps.
    /// Returns the state after the append; `Completed` means this record
    /// was the last one.
    pub fn append(&mut self, record: SensorRecord, row: Vec<String>) -> SessionState {
        if self.state != SessionState::Measuring {
            return self.state;
        }

        self.records.push(record);
        self.rows.push(row);
        self.sample_count += 1;

        if self.cap_reached() {
            self.state = SessionState::Completed;
        }
        self.state
    }

    fn cap_reached(&self) -> bool {
        if let Some(cap) = self.sample_cap {
            if self.sample_count >= cap {
                return true;
            }
        }
        self.elapsed() > self.duration_cap
    }

    /// Measuring → Completed (external stop).
    pub fn complete(&mut self) {
        if self.state == SessionState::Measuring {
            self.state = SessionState::Completed;
        }
    }

    /// Back to Waiting from any state, dropping records, rows and counters.
    pub fn reset(&mut self) {
        self.state = SessionState::Waiting;
        self.started_at = None;
        self.start_time = None;
        self.records.clear();
        self.rows.clear();
        self.sample_count = 0;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// RFC 3339 wall-clock start of the current measurement, if any.
    pub fn start_time(&self) -> Option<&str> {
        self.start_time.as_deref()
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    /// Header plus one row per record, in append order. Pure snapshot;
    /// persisting is the export sink's job.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn last_record(&self) -> Option<&SensorRecord> {
        self.records.last()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
