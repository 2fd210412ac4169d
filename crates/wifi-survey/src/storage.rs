//! SQLite-backed survey store: scans, parsed cells, exit IPs and speed samples.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::types::{
    ExitIpRecord, Observation, ScanRecord, SpeedSample, StoredObservation, SurveyError,
    SurveyResult,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scan (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    time TEXT NOT NULL,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS result (
    scan_id INTEGER NOT NULL REFERENCES scan(id),
    mac VARCHAR(17) NOT NULL,
    essid VARCHAR(32) NOT NULL,
    quality REAL NOT NULL,
    signal_level TEXT NOT NULL,
    frequency TEXT NOT NULL,
    channel INTEGER NOT NULL,
    PRIMARY KEY (scan_id, mac)
);
CREATE TABLE IF NOT EXISTS exit_ip (
    id INTEGER PRIMARY KEY,
    time TEXT NOT NULL,
    ip TEXT
);
CREATE TABLE IF NOT EXISTS speed (
    id INTEGER PRIMARY KEY,
    time TEXT NOT NULL,
    url TEXT NOT NULL,
    duration REAL,
    file_size INTEGER DEFAULT 0,
    bytes_per_second REAL DEFAULT 0,
    http_code INTEGER,
    exit_ip TEXT
);
";

/// Survey database handle.
pub struct SurveyStore {
    db: Connection,
}

impl SurveyStore {
    /// Open or create a survey database at `path`.
    pub fn open(path: &Path) -> SurveyResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!("Opening survey database: {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Open a throwaway database that lives only as long as the handle.
    pub fn open_in_memory() -> SurveyResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> SurveyResult<Self> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Store a raw scan report and return its assigned ID.
    pub fn insert_scan(&self, description: &str, data: &str) -> SurveyResult<ScanRecord> {
        let time = Utc::now();
        self.db.execute(
            "INSERT INTO scan (description, time, data) VALUES (?1, ?2, ?3)",
            params![description, stamp(&time), data],
        )?;
        Ok(ScanRecord {
            id: self.db.last_insert_rowid(),
            description: description.to_string(),
            time,
            data: data.to_string(),
        })
    }

    /// Get a scan by ID.
    pub fn scan(&self, id: i64) -> SurveyResult<ScanRecord> {
        self.db
            .query_row(
                "SELECT id, description, time, data FROM scan WHERE id = ?1",
                params![id],
                scan_from_row,
            )
            .optional()?
            .ok_or(SurveyError::ScanNotFound(id))
    }

    /// All scans in insertion order.
    pub fn scans(&self) -> SurveyResult<Vec<ScanRecord>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, description, time, data FROM scan ORDER BY id")?;
        let rows = stmt.query_map([], scan_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Store the parsed cells of one scan. Either all rows land or none do.
    pub fn insert_observations(
        &mut self,
        scan_id: i64,
        observations: &[Observation],
    ) -> SurveyResult<usize> {
        self.write_observations(scan_id, observations, false)
    }

    /// Replace whatever cells a scan already has with `observations`.
    pub fn replace_observations(
        &mut self,
        scan_id: i64,
        observations: &[Observation],
    ) -> SurveyResult<usize> {
        self.write_observations(scan_id, observations, true)
    }

    fn write_observations(
        &mut self,
        scan_id: i64,
        observations: &[Observation],
        replace: bool,
    ) -> SurveyResult<usize> {
        let tx = self.db.transaction()?;
        if replace {
            tx.execute("DELETE FROM result WHERE scan_id = ?1", params![scan_id])?;
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO result (scan_id, mac, essid, quality, signal_level, frequency, channel)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for obs in observations {
                stmt.execute(params![
                    scan_id,
                    obs.address,
                    obs.essid,
                    obs.quality,
                    obs.signal_level,
                    obs.frequency,
                    obs.channel,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Stored {} observations for scan {scan_id}", observations.len());
        Ok(observations.len())
    }

    /// Observations of one scan in insertion order.
    pub fn observations_for_scan(&self, scan_id: i64) -> SurveyResult<Vec<StoredObservation>> {
        let mut stmt = self.db.prepare(
            "SELECT scan_id, mac, essid, quality, signal_level, frequency, channel
             FROM result WHERE scan_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![scan_id], observation_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every stored observation, grouped by scan.
    pub fn all_observations(&self) -> SurveyResult<Vec<StoredObservation>> {
        let mut stmt = self.db.prepare(
            "SELECT scan_id, mac, essid, quality, signal_level, frequency, channel
             FROM result ORDER BY scan_id, rowid",
        )?;
        let rows = stmt.query_map([], observation_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Record the exit IP reported by an echo service.
    pub fn insert_exit_ip(&self, ip: &str) -> SurveyResult<ExitIpRecord> {
        let time = Utc::now();
        self.db.execute(
            "INSERT INTO exit_ip (time, ip) VALUES (?1, ?2)",
            params![stamp(&time), ip],
        )?;
        Ok(ExitIpRecord {
            id: self.db.last_insert_rowid(),
            time,
            ip: ip.to_string(),
        })
    }

    /// All recorded exit IPs in insertion order.
    pub fn exit_ips(&self) -> SurveyResult<Vec<ExitIpRecord>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, time, COALESCE(ip, '') FROM exit_ip ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ExitIpRecord {
                id: row.get(0)?,
                time: time_from_row(row, 1)?,
                ip: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Store a speed sample; the returned copy carries the assigned ID.
    pub fn insert_speed_sample(&self, sample: &SpeedSample) -> SurveyResult<SpeedSample> {
        self.db.execute(
            "INSERT INTO speed (time, url, duration, file_size, bytes_per_second, http_code, exit_ip)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stamp(&sample.time),
                sample.url,
                sample.duration_secs,
                sample.file_size as i64,
                sample.bytes_per_second,
                sample.http_code,
                sample.exit_ip,
            ],
        )?;
        let mut stored = sample.clone();
        stored.id = self.db.last_insert_rowid();
        Ok(stored)
    }

    /// All speed samples ordered by time.
    pub fn speed_samples(&self) -> SurveyResult<Vec<SpeedSample>> {
        let mut stmt = self.db.prepare(
            "SELECT id, time, url, duration, file_size, bytes_per_second, http_code, exit_ip
             FROM speed ORDER BY time, id",
        )?;
        let rows = stmt.query_map([], |row| {
            let file_size: Option<i64> = row.get(4)?;
            Ok(SpeedSample {
                id: row.get(0)?,
                time: time_from_row(row, 1)?,
                url: row.get(2)?,
                duration_secs: row.get(3)?,
                file_size: file_size.unwrap_or(0).max(0) as u64,
                bytes_per_second: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                http_code: row.get(6)?,
                exit_ip: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
    Ok(ScanRecord {
        id: row.get(0)?,
        description: row.get(1)?,
        time: time_from_row(row, 2)?,
        data: row.get(3)?,
    })
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<StoredObservation> {
    Ok(StoredObservation {
        scan_id: row.get(0)?,
        observation: Observation {
            address: row.get(1)?,
            essid: row.get(2)?,
            quality: row.get(3)?,
            signal_level: row.get(4)?,
            frequency: row.get(5)?,
            channel: row.get(6)?,
        },
    })
}

/// Fixed-width UTC timestamps so text order matches time order.
fn stamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn time_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
