//! Core data types for scan observations, stored scans, and speed samples.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One wireless cell parsed out of a scan report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Hardware address exactly as printed after `Address:`.
    pub address: String,
    pub essid: String,
    /// `numerator / denominator` of the reported quality fraction.
    /// Usually within [0, 1], but a numerator above the denominator passes
    /// through unclamped.
    pub quality: f64,
    /// Signal level text without the `dBm` unit.
    pub signal_level: String,
    /// Frequency text without the `GHz` unit.
    pub frequency: String,
    pub channel: u32,
}

/// A raw scan report together with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub description: String,
    pub time: DateTime<Utc>,
    /// Unparsed output of the scan command.
    pub data: String,
}

/// An observation as persisted, keyed to the scan it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObservation {
    pub scan_id: i64,
    #[serde(flatten)]
    pub observation: Observation,
}

/// A single timed download against a test file.
///
/// Failed downloads are still recorded: `duration_secs` and `http_code`
/// stay `None` and the size/speed fields stay zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub id: i64,
    pub time: DateTime<Utc>,
    pub url: String,
    pub duration_secs: Option<f64>,
    pub file_size: u64,
    pub bytes_per_second: f64,
    pub http_code: Option<u16>,
    pub exit_ip: Option<String>,
}

impl SpeedSample {
    /// A not-yet-measured sample for `url`, stamped with the current time.
    pub fn pending(url: &str, exit_ip: Option<String>) -> Self {
        Self {
            id: 0,
            time: Utc::now(),
            url: url.to_string(),
            duration_secs: None,
            file_size: 0,
            bytes_per_second: 0.0,
            http_code: None,
            exit_ip,
        }
    }
}

/// The exit address reported by an IP echo service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitIpRecord {
    pub id: i64,
    pub time: DateTime<Utc>,
    pub ip: String,
}

/// What was structurally wrong with a scan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "field", rename_all = "snake_case")]
pub enum MalformedKind {
    /// A cell started while the previous one had no ESSID yet.
    DuplicateOpenRecord,
    /// Input ended inside a cell.
    IncompleteRecord,
    InvalidChannel,
    InvalidQualityRatio,
    UnterminatedQuote,
    /// ESSID closed a cell that never reported the named field group.
    MissingField(&'static str),
    /// A field line appeared outside any cell.
    OrphanField,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedKind::DuplicateOpenRecord => {
                write!(f, "cell started before previous cell closed")
            }
            MalformedKind::IncompleteRecord => write!(f, "cell has no ESSID before end of input"),
            MalformedKind::InvalidChannel => write!(f, "channel is not an integer"),
            MalformedKind::InvalidQualityRatio => {
                write!(f, "quality ratio is not a valid fraction")
            }
            MalformedKind::UnterminatedQuote => write!(f, "ESSID quote is not terminated"),
            MalformedKind::MissingField(field) => write!(f, "cell closed without {field}"),
            MalformedKind::OrphanField => write!(f, "field outside of any cell"),
        }
    }
}

/// A scan report that could not be parsed, with the offending line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[error("Malformed scan report at line {line_number}: {kind}: {line:?}")]
pub struct MalformedInput {
    pub kind: MalformedKind,
    /// 1-based line number within the raw report.
    pub line_number: usize,
    /// The offending line, whitespace-trimmed.
    pub line: String,
}

impl MalformedInput {
    pub fn new(kind: MalformedKind, line_number: usize, line: &str) -> Self {
        Self {
            kind,
            line_number,
            line: line.to_string(),
        }
    }
}

/// Errors that can occur in the survey library.
#[derive(thiserror::Error, Debug)]
pub enum SurveyError {
    #[error(transparent)]
    Malformed(#[from] MalformedInput),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Scan not found: {0}")]
    ScanNotFound(i64),
}

/// Convenience result type.
pub type SurveyResult<T> = Result<T, SurveyError>;
