//! wifi-survey CLI — wireless scan and connection speed recording.

pub mod config;
pub mod plot;
pub mod session;
pub mod speed;

pub use config::{resolve_speed_db, resolve_survey_db};
pub use session::{IwlistScanner, ScanSession, ScanSource};
pub use speed::SpeedProbe;
