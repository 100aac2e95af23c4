use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::time::{sleep, Duration};

use gait_collector_rs::collector::Collector;
use gait_collector_rs::export::CsvDirSink;
use gait_collector_rs::sensors::{self, SensorInventory, SensorRig};
use gait_collector_rs::session::{Profile, SessionState};
use gait_collector_rs::status::{current_timestamp, CollectorStatus};

#[derive(Parser, Debug)]
#[command(name = "gait_collector")]
#[command(about = "Bounded gait data collection - filtered sensor streams to CSV", long_about = None)]
struct Args {
    /// Hard run limit in seconds on top of the profile caps (0 = profile caps only)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Capture profile (compact, extended)
    #[arg(long, default_value = "compact")]
    profile: String,

    /// Base name for the exported CSV
    #[arg(long, default_value = "sensor_data")]
    label: String,

    /// Output directory
    #[arg(long, default_value = "gait_sessions")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let profile = match args.profile.as_str() {
        "compact" => Profile::compact(),
        "extended" => Profile::extended(),
        other => anyhow::bail!("unknown profile '{other}' (expected compact or extended)"),
    };

    println!("[{}] Gait Collector Starting", ts_now());
    println!("  Profile: {}", args.profile);
    println!("  Label: {}", args.label);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let inventory = SensorInventory::full();
    let mut collector = Collector::new(profile.clone());

    // Subscribe first so a missing sensor fails before any session state
    // changes, then start measuring.
    let (rig, mut streams) = SensorRig::subscribe(&profile, &inventory)?;
    collector.start(&inventory)?;
    collector.seed_location(sensors::last_known_reports());

    let mut accel_count = 0u64;
    let mut gyro_count = 0u64;
    let mut mag_count = 0u64;
    let mut fix_count = 0u64;

    let started = Utc::now();
    let mut last_status_update = Utc::now();

    println!("[{}] Measuring...", ts_now());

    let mut state = SessionState::Measuring;
    loop {
        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(started);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Run limit reached, stopping...", ts_now());
                if collector.state()? == SessionState::Measuring {
                    collector.stop()?;
                }
                state = collector.state()?;
                break;
            }
        }

        while let Ok(sample) = streams.accel.try_recv() {
            state = collector.handle_accel(sample)?;
            accel_count += 1;
        }

        if let Some(gyro_rx) = streams.gyro.as_mut() {
            while let Ok(sample) = gyro_rx.try_recv() {
                collector.handle_gyro(sample);
                gyro_count += 1;
            }
        }

        while let Ok(sample) = streams.mag.try_recv() {
            collector.handle_mag(sample);
            mag_count += 1;
        }

        while let Ok(report) = streams.location.try_recv() {
            collector.handle_location(report);
            fix_count += 1;
        }

        if state == SessionState::Completed {
            println!(
                "[{}] Caps reached after {} records",
                ts_now(),
                collector.sample_count()?
            );
            break;
        }

        // Refresh the polled status file every 2 seconds
        let now = Utc::now();
        if now.signed_duration_since(last_status_update).num_seconds() >= 2 {
            let status = build_status(
                &collector,
                accel_count,
                gyro_count,
                mag_count,
                fix_count,
            )?;
            let status_path = format!("{}/collector_status.json", args.output_dir);
            if let Err(e) = status.save(&status_path) {
                log::warn!("status write failed: {e}");
            }
            last_status_update = now;
        }

        sleep(Duration::from_millis(1)).await;
    }

    rig.shutdown();

    if state == SessionState::Completed {
        let sink = CsvDirSink::new(&args.output_dir);
        // A failed write keeps the session in memory; try once more before
        // giving up so a transient sink error doesn't cost the recording.
        let mut saved = None;
        for attempt in 1..=2 {
            match collector.save(&args.label, &sink) {
                Ok(name) => {
                    saved = Some(name);
                    break;
                }
                Err(e) => {
                    log::error!("export attempt {attempt} failed: {e}");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
        match saved {
            Some(name) => println!("[{}] Saved {}", ts_now(), name),
            None => println!("[{}] Export failed; records remain in memory", ts_now()),
        }
    }

    let status = build_status(&collector, accel_count, gyro_count, mag_count, fix_count)?;
    let status_path = format!("{}/collector_status.json", args.output_dir);
    let _ = status.save(&status_path);

    println!("\n=== Final Stats ===");
    println!("Records: {}", collector.sample_count()?);
    println!(
        "Samples seen: {} accel / {} gyro / {} mag / {} fixes",
        accel_count, gyro_count, mag_count, fix_count
    );
    println!(
        "Elapsed: {:.1} s",
        collector.elapsed_ms()? as f64 / 1000.0
    );

    Ok(())
}

fn build_status(
    collector: &Collector,
    accel_count: u64,
    gyro_count: u64,
    mag_count: u64,
    fix_count: u64,
) -> Result<CollectorStatus> {
    let snapshot = collector.current_snapshot()?;
    let state = collector.state()?;
    Ok(CollectorStatus {
        timestamp: current_timestamp(),
        state,
        completed: state == SessionState::Completed,
        sample_count: collector.sample_count()?,
        elapsed_seconds: collector.elapsed_ms()? as f64 / 1000.0,
        accel_samples_seen: accel_count,
        gyro_samples_seen: gyro_count,
        mag_samples_seen: mag_count,
        location_fixes_seen: fix_count,
        accelerometer: snapshot.accelerometer,
        magnetometer: snapshot.magnetometer,
        angle: snapshot.angle,
        gps: snapshot.gps,
    })
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
