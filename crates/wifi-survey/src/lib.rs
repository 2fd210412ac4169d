//! wifi-survey — parsing of wireless scan reports, survey storage, and plot series.

pub mod chart;
pub mod extract;
pub mod parser;
pub mod series;
pub mod storage;
pub mod types;

pub use chart::Chart;
pub use extract::{extract_field, Field};
pub use parser::parse;
pub use series::{quality_series, speed_series, start_anchored, PlotData, Series};
pub use storage::SurveyStore;
pub use types::*;
