use crate::error::Result;
use crate::session::Profile;
use crate::types::SensorRecord;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;

/// Header row for a profile's field set. Field order is fixed:
/// time, accelerometer, [gyroscope,] magnetometer, [angular velocity,
/// angles,] then position.
pub fn header(profile: &Profile) -> Vec<String> {
    let mut fields: Vec<&str> = vec!["Time", "AccX", "AccY", "AccZ"];
    if profile.include_orientation {
        fields.extend(["GyroX", "GyroY", "GyroZ"]);
    }
    fields.extend(["MagX", "MagY", "MagZ"]);
    if profile.include_orientation {
        fields.extend(["AngVelX", "AngVelY", "AngVelZ", "Pitch", "Roll", "Yaw"]);
    }
    fields.extend(["Latitude", "Longitude"]);
    fields.into_iter().map(str::to_string).collect()
}

/// Encode one record as text fields in header order. Floats keep their
/// native `Display` form; no rounding happens on export.
pub fn encode_row(record: &SensorRecord, include_orientation: bool) -> Vec<String> {
    let mut row = Vec::with_capacity(if include_orientation { 18 } else { 9 });
    row.push(record.elapsed_ms.to_string());
    push_vector(&mut row, record.accelerometer);
    if include_orientation {
        push_vector(&mut row, record.gyroscope);
    }
    push_vector(&mut row, record.magnetometer);
    if include_orientation {
        push_vector(&mut row, record.angular_velocity);
        push_vector(&mut row, record.angle);
    }
    row.push(record.gps.latitude.to_string());
    row.push(record.gps.longitude.to_string());
    row
}

fn push_vector(row: &mut Vec<String>, v: crate::types::Vector3) {
    row.push(v.x.to_string());
    row.push(v.y.to_string());
    row.push(v.z.to_string());
}

/// `<base>_<yyyyMMdd_HHmmss>.csv` — the timestamp keeps repeated saves of
/// the same label from colliding.
pub fn timestamped_name(base: &str) -> String {
    format!("{}_{}.csv", base, Utc::now().format("%Y%m%d_%H%M%S"))
}

/// Destination for exported rows. The in-memory model stays untouched on
/// failure so a save can be retried without re-collecting.
pub trait ExportSink {
    fn write(&self, name: &str, rows: &[Vec<String>]) -> Result<()>;
}

/// Writes each export as a CSV file under a fixed directory.
pub struct CsvDirSink {
    dir: PathBuf,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvDirSink { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ExportSink for CsvDirSink {
    fn write(&self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        log::info!("wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}
