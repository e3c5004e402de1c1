//! Data Log Service
//!
//! ## Responsibilities
//!
//! - Append one CSV row per persistence cycle (fixed column schema)
//! - Rewrite the latest-snapshot JSON file
//! - Retention trimming: drop rows older than the configured horizon
//!
//! A single mutex serializes appends against trimming; the trim rewrites
//! to a temporary file and atomically renames it over the log so a
//! concurrent append can never be lost mid-rewrite. Absent values are
//! written as empty cells, never zeros.

use crate::error::{Error, Result};
use crate::fusion::{ConnectionStatus, FusedState};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Fixed CSV column schema
const CSV_HEADER: &str = "timestamp,sht45_temp,sht45_humidity,hdc3022_temp,hdc3022_humidity,\
air_temp,air_humidity,sensor_count,air_vpd,canopy_vpd,thermal_vpd,enhanced_vpd,\
thermal_min,thermal_max,thermal_mean,thermal_median,thermal_mode,thermal_std_dev,\
filtered_pixels,total_pixels,node_status,camera_status";

/// Append-only CSV log + latest-snapshot JSON writer
pub struct DataLogService {
    csv_path: PathBuf,
    snapshot_path: PathBuf,
    retention_days: i64,
    /// Serializes appends against retention trimming
    file_lock: Mutex<()>,
}

impl DataLogService {
    pub fn new(csv_path: PathBuf, snapshot_path: PathBuf, retention_days: i64) -> Self {
        Self {
            csv_path,
            snapshot_path,
            retention_days,
            file_lock: Mutex::new(()),
        }
    }

    /// Append the state as one CSV row and rewrite the latest snapshot.
    /// Failures are surfaced to the caller to log; the acquisition loop
    /// never treats them as fatal.
    pub async fn persist(&self, state: &FusedState) -> Result<()> {
        let _guard = self.file_lock.lock().await;

        if let Some(dir) = self.csv_path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let fresh = !fs::try_exists(&self.csv_path).await.unwrap_or(false);

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .await?;

        if fresh {
            file.write_all(CSV_HEADER.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }

        let row = csv_row(state);
        file.write_all(row.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        let snapshot = serde_json::to_vec_pretty(state)?;
        fs::write(&self.snapshot_path, snapshot).await?;

        tracing::info!(path = %self.csv_path.display(), "Fused state persisted");
        Ok(())
    }

    /// Drop rows older than the retention horizon by rewriting the log
    /// to a temporary file and atomically replacing the original.
    pub async fn trim_retention(&self) -> Result<()> {
        let _guard = self.file_lock.lock().await;

        if !fs::try_exists(&self.csv_path).await.unwrap_or(false) {
            return Ok(());
        }

        let horizon = Utc::now() - ChronoDuration::days(self.retention_days);
        let content = fs::read_to_string(&self.csv_path).await?;

        let mut kept = Vec::new();
        let mut dropped = 0usize;

        for (i, line) in content.lines().enumerate() {
            if i == 0 {
                kept.push(line);
                continue;
            }
            if row_is_expired(line, horizon) {
                dropped += 1;
            } else {
                kept.push(line);
            }
        }

        if dropped == 0 {
            tracing::debug!("Retention sweep: nothing to trim");
            return Ok(());
        }

        let tmp_path = self.csv_path.with_extension("csv.tmp");
        let mut body = kept.join("\n");
        body.push('\n');
        fs::write(&tmp_path, body).await?;
        fs::rename(&tmp_path, &self.csv_path)
            .await
            .map_err(|e| Error::Persistence(format!("retention rename: {}", e)))?;

        tracing::info!(dropped = dropped, "Retention sweep trimmed old rows");
        Ok(())
    }
}

/// A row is expired when its timestamp parses and is older than the
/// horizon; rows with unparsable timestamps are kept rather than
/// silently destroyed.
fn row_is_expired(line: &str, horizon: DateTime<Utc>) -> bool {
    let Some(ts_field) = line.split(',').next() else {
        return false;
    };
    match DateTime::parse_from_rfc3339(ts_field) {
        Ok(ts) => ts.with_timezone(&Utc) < horizon,
        Err(_) => false,
    }
}

fn csv_row(state: &FusedState) -> String {
    let sensor = |id: &str| state.sensors.get(id);
    let sensor_temp = |id: &str| sensor(id).and_then(|r| r.temperature);
    let sensor_rh = |id: &str| sensor(id).and_then(|r| r.humidity);

    let air_temp = state.air.as_ref().map(|a| a.temperature);
    let air_rh = state.air.as_ref().map(|a| a.humidity);
    let sensor_count = state.air.as_ref().map(|a| a.sensor_count).unwrap_or(0);

    let thermal = state.thermal.as_ref();

    [
        state.timestamp.to_rfc3339(),
        cell(sensor_temp("sht45")),
        cell(sensor_rh("sht45")),
        cell(sensor_temp("hdc3022")),
        cell(sensor_rh("hdc3022")),
        cell(air_temp),
        cell(air_rh),
        sensor_count.to_string(),
        cell(state.vpd.air_vpd),
        cell(state.vpd.canopy_vpd),
        cell(state.vpd.thermal_vpd),
        cell(state.vpd.enhanced_vpd),
        cell(thermal.and_then(|t| t.min)),
        cell(thermal.and_then(|t| t.max)),
        cell(thermal.and_then(|t| t.mean)),
        cell(thermal.and_then(|t| t.median)),
        cell(thermal.and_then(|t| t.mode)),
        cell(thermal.and_then(|t| t.std_dev)),
        thermal.map(|t| t.filtered_pixels).unwrap_or(0).to_string(),
        thermal.map(|t| t.total_pixels).unwrap_or(0).to_string(),
        status_cell(state.node_status).to_string(),
        status_cell(state.camera_status).to_string(),
    ]
    .join(",")
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn status_cell(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connected => "connected",
        ConnectionStatus::ConnectedFallback => "connected_fallback",
        ConnectionStatus::Disconnected => "disconnected",
    }
}
