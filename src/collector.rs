use crate::error::{CollectorError, Result};
use crate::export::{self, ExportSink};
use crate::filters::SignalChain;
use crate::location::{best_fix, LocationReport};
use crate::orientation::OrientationIntegrator;
use crate::sensors::SensorInventory;
use crate::session::{Profile, Session, SessionState};
use crate::types::{AxisGroup, GeoFix, SensorRecord, Vector3, VectorSample};
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// The provider whose disappearance invalidates the current fix.
const PRIMARY_PROVIDER: &str = "gps";

/// Latest known value per stream. Each cell is written only by its own
/// stream's processing step and read without locking by the
/// record-assembly path and status snapshots.
pub struct LatestSlots {
    accel: AtomicCell<Vector3>,
    mag: AtomicCell<Vector3>,
    gyro: AtomicCell<Vector3>,
    angle: AtomicCell<Vector3>,
    fix: AtomicCell<GeoFix>,
}

impl LatestSlots {
    fn new() -> Self {
        LatestSlots {
            accel: AtomicCell::new(Vector3::ZERO),
            mag: AtomicCell::new(Vector3::ZERO),
            gyro: AtomicCell::new(Vector3::ZERO),
            angle: AtomicCell::new(Vector3::ZERO),
            fix: AtomicCell::new(GeoFix::NONE),
        }
    }

    fn clear(&self) {
        self.accel.store(Vector3::ZERO);
        self.mag.store(Vector3::ZERO);
        self.gyro.store(Vector3::ZERO);
        self.angle.store(Vector3::ZERO);
        self.fix.store(GeoFix::NONE);
    }
}

/// The collection pipeline: per-stream conditioning feeding a bounded
/// measurement session.
///
/// Accelerometer and magnetometer samples run through their signal
/// chains; gyroscope samples feed the orientation integrator; location
/// reports land directly in the fix slot. Only the accelerometer path
/// appends records, reading the latest known values of every other
/// stream at that moment — stale values are tolerated, blocking is not.
pub struct Collector {
    profile: Profile,
    accel_chain: SignalChain,
    mag_chain: SignalChain,
    integrator: OrientationIntegrator,
    slots: Arc<LatestSlots>,
    session: Arc<Mutex<Session>>,
    collecting: Arc<AtomicBool>,
}

impl Collector {
    pub fn new(profile: Profile) -> Self {
        let accel_chain = SignalChain::new(profile.accel_params);
        let mag_chain = SignalChain::new(profile.mag_params);
        Collector {
            profile,
            accel_chain,
            mag_chain,
            integrator: OrientationIntegrator::new(),
            slots: Arc::new(LatestSlots::new()),
            session: Arc::new(Mutex::new(Session::new())),
            collecting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| CollectorError::Internal("session lock poisoned".to_string()))
    }

    fn required_sensors(&self) -> Vec<AxisGroup> {
        let mut required = vec![AxisGroup::Accelerometer, AxisGroup::Magnetometer];
        if self.profile.include_orientation {
            required.push(AxisGroup::Gyroscope);
        }
        required
    }

    /// Waiting → Measuring. Fails without touching any state when a
    /// required sensor is missing; otherwise re-seeds the conditioning
    /// chains and integrator and starts the session clock.
    pub fn start(&mut self, inventory: &SensorInventory) -> Result<()> {
        if self.lock_session()?.state() == SessionState::Measuring {
            return Err(CollectorError::AlreadyMeasuring);
        }
        for group in self.required_sensors() {
            if !inventory.has(group) {
                return Err(CollectorError::MissingSensor(group));
            }
        }

        self.accel_chain.reset();
        self.mag_chain.reset();
        self.integrator.reset();
        self.slots.clear();

        let mut session = self.lock_session()?;
        session.begin(&self.profile, export::header(&self.profile));
        self.collecting.store(true, Ordering::SeqCst);
        log::info!(
            "measurement started (cap: {:?} samples / {:?})",
            self.profile.sample_cap,
            self.profile.duration_cap
        );
        Ok(())
    }

    /// Seed the current fix from a set of last-known provider reports.
    /// Called right after subscribing and when a provider comes back.
    pub fn seed_location(&self, reports: Vec<LocationReport>) {
        if let Some(best) = best_fix(reports) {
            log::debug!(
                "seeded fix from {} (accuracy {:.1} m)",
                best.provider,
                best.accuracy
            );
            self.slots.fix.store(best.fix);
        }
    }

    /// Process one accelerometer sample. When the gate accepts it and a
    /// measurement is running, a record is assembled from the latest
    /// known values of every stream. Returns the session state after the
    /// sample so drivers can notice completion.
    pub fn handle_accel(&mut self, sample: VectorSample) -> Result<SessionState> {
        let smoothed = match self.accel_chain.process(sample.vector()) {
            Some(v) => v,
            None => return self.state(),
        };
        self.slots.accel.store(smoothed);

        if !self.collecting.load(Ordering::SeqCst) {
            return self.state();
        }

        let mut session = self.lock_session()?;
        if session.state() != SessionState::Measuring {
            return Ok(session.state());
        }

        let record = SensorRecord {
            elapsed_ms: session.elapsed_ms(),
            accelerometer: smoothed,
            gyroscope: self.slots.gyro.load(),
            magnetometer: self.slots.mag.load(),
            angular_velocity: self.integrator.angular_velocity(),
            angle: self.slots.angle.load(),
            gps: self.slots.fix.load(),
        };
        let row = export::encode_row(&record, self.profile.include_orientation);
        let state = session.append(record, row);

        if state == SessionState::Completed {
            self.collecting.store(false, Ordering::SeqCst);
            log::info!(
                "measurement complete: {} records in {:.1} s",
                session.sample_count(),
                session.elapsed().as_secs_f64()
            );
        }
        Ok(state)
    }

    /// Process one gyroscope sample: integrate orientation and refresh
    /// the rate/angle slots. Ignored entirely in profiles without
    /// orientation fields.
    pub fn handle_gyro(&mut self, sample: VectorSample) {
        if !self.profile.include_orientation {
            return;
        }
        self.integrator.integrate(sample.vector(), sample.timestamp_ns);
        self.slots.gyro.store(sample.vector());
        self.slots.angle.store(self.integrator.angles_deg());
    }

    /// Process one magnetometer sample through its signal chain.
    pub fn handle_mag(&mut self, sample: VectorSample) {
        if let Some(smoothed) = self.mag_chain.process(sample.vector()) {
            self.slots.mag.store(smoothed);
        }
    }

    /// Location updates bypass the filters; the freshest report wins.
    pub fn handle_location(&self, report: LocationReport) {
        self.slots.fix.store(report.fix);
    }

    /// A disabled primary provider drops the fix back to the sentinel
    /// instead of letting a stale position linger in new records.
    pub fn provider_disabled(&self, provider: &str) {
        if provider == PRIMARY_PROVIDER {
            log::warn!("location provider '{provider}' disabled, clearing fix");
            self.slots.fix.store(GeoFix::NONE);
        }
    }

    /// Measuring → Completed (external stop; accrual freezes).
    pub fn stop(&mut self) -> Result<()> {
        let mut session = self.lock_session()?;
        if session.state() != SessionState::Measuring {
            return Err(CollectorError::NotMeasuring);
        }
        self.collecting.store(false, Ordering::SeqCst);
        session.complete();
        Ok(())
    }

    /// Measuring → Waiting, bypassing Completed. Subscriptions are torn
    /// down by the driver; collected data is discarded.
    pub fn cancel(&mut self) -> Result<()> {
        let mut session = self.lock_session()?;
        if session.state() != SessionState::Measuring {
            return Err(CollectorError::NotMeasuring);
        }
        self.collecting.store(false, Ordering::SeqCst);
        session.reset();
        log::info!("measurement cancelled");
        Ok(())
    }

    /// Any state → Waiting. Records, rows and counters are dropped; the
    /// conditioning chains keep their state until the next `start()`
    /// re-seeds them.
    pub fn reset(&mut self) -> Result<()> {
        let mut session = self.lock_session()?;
        self.collecting.store(false, Ordering::SeqCst);
        session.reset();
        Ok(())
    }

    /// Export the completed measurement through `sink` under
    /// `base_name` plus a timestamp suffix. On failure the rows stay in
    /// memory, so the caller can log and retry.
    pub fn save(&self, base_name: &str, sink: &dyn ExportSink) -> Result<String> {
        let session = self.lock_session()?;
        if session.state() != SessionState::Completed {
            return Err(CollectorError::InvalidState(
                "measurement not complete".to_string(),
            ));
        }
        let name = export::timestamped_name(base_name);
        sink.write(&name, session.rows())?;
        Ok(name)
    }

    pub fn state(&self) -> Result<SessionState> {
        Ok(self.lock_session()?.state())
    }

    pub fn sample_count(&self) -> Result<u32> {
        Ok(self.lock_session()?.sample_count())
    }

    pub fn elapsed_ms(&self) -> Result<u64> {
        Ok(self.lock_session()?.elapsed_ms())
    }

    /// Snapshot of all records accumulated so far, in append order.
    pub fn all_records(&self) -> Result<Vec<SensorRecord>> {
        Ok(self.lock_session()?.records().to_vec())
    }

    /// Live view for display: latest known values with acceleration and
    /// magnetic components rounded to 2 decimal places and the position
    /// to 6. Stored records are never rounded.
    pub fn current_snapshot(&self) -> Result<SensorRecord> {
        let elapsed_ms = self.lock_session()?.elapsed_ms();
        let fix = self.slots.fix.load();
        Ok(SensorRecord {
            elapsed_ms,
            accelerometer: self.slots.accel.load().map(|v| round_to(v, 2)),
            gyroscope: self.slots.gyro.load(),
            magnetometer: self.slots.mag.load().map(|v| round_to(v, 2)),
            angular_velocity: self.integrator.angular_velocity(),
            angle: self.slots.angle.load(),
            gps: GeoFix::new(round_to_f64(fix.latitude, 6), round_to_f64(fix.longitude, 6)),
        })
    }
}

fn round_to(value: f32, places: i32) -> f32 {
    let factor = 10f32.powi(places);
    (value * factor).round() / factor
}

fn round_to_f64(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Captures exports in memory.
    struct MemorySink {
        writes: StdMutex<Vec<(String, Vec<Vec<String>>)>>,
        fail: bool,
    }

    impl MemorySink {
        fn new() -> Self {
            MemorySink {
                writes: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            MemorySink {
                writes: StdMutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl ExportSink for MemorySink {
        fn write(&self, name: &str, rows: &[Vec<String>]) -> Result<()> {
            if self.fail {
                return Err(CollectorError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "sink unavailable",
                )));
            }
            self.writes
                .lock()
                .unwrap()
                .push((name.to_string(), rows.to_vec()));
            Ok(())
        }
    }

    /// Alternating large-step samples: every one clears the threshold.
    fn accel_sample(i: i64) -> VectorSample {
        let level = if i % 2 == 0 { 10.0 } else { 0.0 };
        VectorSample::new(level, 0.0, 9.8, i * 20_000_000)
    }

    #[test]
    fn test_start_requires_sensors() {
        let mut collector = Collector::new(Profile::extended());
        let err = collector
            .start(&SensorInventory::without_gyroscope())
            .unwrap_err();
        assert!(matches!(
            err,
            CollectorError::MissingSensor(AxisGroup::Gyroscope)
        ));
        assert_eq!(collector.state().unwrap(), SessionState::Waiting);

        // compact profile does not need the gyroscope
        let mut compact = Collector::new(Profile::compact());
        compact
            .start(&SensorInventory::without_gyroscope())
            .unwrap();
        assert_eq!(compact.state().unwrap(), SessionState::Measuring);
    }

    #[test]
    fn test_double_start_rejected() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();
        assert!(matches!(
            collector.start(&SensorInventory::full()),
            Err(CollectorError::AlreadyMeasuring)
        ));
    }

    #[test]
    fn test_records_accumulate_below_cap() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();

        for i in 0..50 {
            collector.handle_accel(accel_sample(i)).unwrap();
        }

        assert_eq!(collector.state().unwrap(), SessionState::Measuring);
        assert_eq!(collector.all_records().unwrap().len(), 50);
        assert_eq!(collector.sample_count().unwrap(), 50);
    }

    #[test]
    fn test_sample_cap_completes() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();

        let mut final_state = SessionState::Measuring;
        for i in 0..600 {
            final_state = collector.handle_accel(accel_sample(i)).unwrap();
            if final_state == SessionState::Completed {
                break;
            }
        }
        assert_eq!(final_state, SessionState::Completed);
        assert_eq!(collector.sample_count().unwrap(), 500);
        // accrual is frozen after completion
        collector.handle_accel(accel_sample(601)).unwrap();
        assert_eq!(collector.sample_count().unwrap(), 500);
    }

    #[test]
    fn test_duration_cap_completes() {
        let profile = Profile {
            sample_cap: None,
            duration_cap: Duration::from_millis(30),
            ..Profile::compact()
        };
        let mut collector = Collector::new(profile);
        collector.start(&SensorInventory::full()).unwrap();

        collector.handle_accel(accel_sample(0)).unwrap();
        assert_eq!(collector.state().unwrap(), SessionState::Measuring);

        std::thread::sleep(Duration::from_millis(45));
        let state = collector.handle_accel(accel_sample(1)).unwrap();
        assert_eq!(state, SessionState::Completed);
    }

    #[test]
    fn test_other_streams_fill_record_fields() {
        let mut collector = Collector::new(Profile::extended());
        collector.start(&SensorInventory::full()).unwrap();

        collector.handle_mag(VectorSample::new(40.0, -10.0, 5.0, 0));
        collector.handle_gyro(VectorSample::new(0.0, 0.0, 1.0, 0));
        collector.handle_gyro(VectorSample::new(0.0, 0.0, 1.0, 1_000_000_000));
        collector.handle_location(LocationReport::new("gps", 37.45, 126.65, 8.0));
        collector.handle_accel(accel_sample(0)).unwrap();

        let records = collector.all_records().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.magnetometer.x > 0.0);
        assert_eq!(record.angular_velocity, Vector3::new(0.0, 0.0, 1.0));
        assert!((record.angle.z - 1.0_f32.to_degrees()).abs() < 1e-3);
        assert_eq!(record.gps, GeoFix::new(37.45, 126.65));
    }

    #[test]
    fn test_compact_profile_ignores_gyro() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();

        collector.handle_gyro(VectorSample::new(1.0, 1.0, 1.0, 0));
        collector.handle_gyro(VectorSample::new(1.0, 1.0, 1.0, 1_000_000_000));
        collector.handle_accel(accel_sample(0)).unwrap();

        let record = collector.all_records().unwrap()[0];
        assert_eq!(record.angle, Vector3::ZERO);
        assert_eq!(record.angular_velocity, Vector3::ZERO);
    }

    #[test]
    fn test_cancel_discards_and_waits() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();
        collector.handle_accel(accel_sample(0)).unwrap();

        collector.cancel().unwrap();
        assert_eq!(collector.state().unwrap(), SessionState::Waiting);
        assert!(collector.all_records().unwrap().is_empty());

        // samples arriving after cancel must not accrue
        collector.handle_accel(accel_sample(1)).unwrap();
        assert!(collector.all_records().unwrap().is_empty());

        assert!(matches!(
            collector.cancel(),
            Err(CollectorError::NotMeasuring)
        ));
    }

    #[test]
    fn test_reset_then_start_begins_fresh() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();
        for i in 0..10 {
            collector.handle_accel(accel_sample(i)).unwrap();
        }
        collector.stop().unwrap();
        assert_eq!(collector.state().unwrap(), SessionState::Completed);

        collector.reset().unwrap();
        assert_eq!(collector.state().unwrap(), SessionState::Waiting);
        assert_eq!(collector.sample_count().unwrap(), 0);

        collector.start(&SensorInventory::full()).unwrap();
        assert_eq!(collector.sample_count().unwrap(), 0);
        assert!(collector.all_records().unwrap().is_empty());
        assert!(collector.elapsed_ms().unwrap() < 1_000);
    }

    #[test]
    fn test_save_exports_header_and_rows() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();
        for i in 0..5 {
            collector.handle_accel(accel_sample(i)).unwrap();
        }

        let sink = MemorySink::new();
        // not complete yet
        assert!(collector.save("walk", &sink).is_err());

        collector.stop().unwrap();
        let name = collector.save("walk", &sink).unwrap();
        assert!(name.starts_with("walk_") && name.ends_with(".csv"));

        let writes = sink.writes.lock().unwrap();
        let (_, rows) = &writes[0];
        assert_eq!(rows.len(), 6); // header + 5 records
        assert_eq!(rows[0][0], "Time");
        assert_eq!(rows[1].len(), rows[0].len());
    }

    #[test]
    fn test_failed_save_keeps_data_for_retry() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();
        for i in 0..3 {
            collector.handle_accel(accel_sample(i)).unwrap();
        }
        collector.stop().unwrap();

        assert!(collector.save("walk", &MemorySink::failing()).is_err());
        // data retained: a retry against a working sink succeeds
        let sink = MemorySink::new();
        collector.save("walk", &sink).unwrap();
        assert_eq!(sink.writes.lock().unwrap()[0].1.len(), 4);
    }

    #[test]
    fn test_provider_disabled_clears_fix() {
        let collector = Collector::new(Profile::compact());
        collector.handle_location(LocationReport::new("gps", 37.0, 127.0, 5.0));
        collector.provider_disabled("network");
        assert!(collector.current_snapshot().unwrap().gps.has_fix());
        collector.provider_disabled("gps");
        assert!(!collector.current_snapshot().unwrap().gps.has_fix());
    }

    #[tokio::test]
    async fn test_live_streams_feed_records() {
        use crate::sensors::{self, SensorRig};

        let mut collector = Collector::new(Profile::compact());
        let inventory = SensorInventory::full();
        let (rig, mut streams) = SensorRig::subscribe(collector.profile(), &inventory).unwrap();
        collector.start(&inventory).unwrap();
        collector.seed_location(sensors::last_known_reports());

        // Drive the drain loop briefly; the simulated walk clears the gate
        // on most samples, so records must accumulate.
        for _ in 0..30 {
            while let Ok(sample) = streams.accel.try_recv() {
                collector.handle_accel(sample).unwrap();
            }
            while let Ok(sample) = streams.mag.try_recv() {
                collector.handle_mag(sample);
            }
            while let Ok(report) = streams.location.try_recv() {
                collector.handle_location(report);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(collector.state().unwrap(), SessionState::Measuring);
        assert!(!collector.all_records().unwrap().is_empty());
        assert!(collector.current_snapshot().unwrap().gps.has_fix());

        collector.cancel().unwrap();
        rig.shutdown();
        assert_eq!(collector.state().unwrap(), SessionState::Waiting);
    }

    #[test]
    fn test_snapshot_rounds_display_values() {
        let mut collector = Collector::new(Profile::compact());
        collector.start(&SensorInventory::full()).unwrap();
        collector
            .handle_accel(VectorSample::new(1.23456, 0.0, 0.0, 0))
            .unwrap();
        collector.handle_location(LocationReport::new("gps", 37.4567891234, 126.0, 5.0));

        let snapshot = collector.current_snapshot().unwrap();
        // two decimals on acceleration, six on position
        assert!((snapshot.accelerometer.x - 0.99).abs() < 1e-6);
        assert_eq!(snapshot.gps.latitude, 37.456789);

        // stored record keeps full precision
        let record = collector.all_records().unwrap()[0];
        assert!(record.accelerometer.x != snapshot.accelerometer.x);
    }
}
