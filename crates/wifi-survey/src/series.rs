//! Plot series assembly from stored scans and speed samples.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::Serialize;

use crate::types::{ScanRecord, SpeedSample, StoredObservation, SurveyResult};

/// One labelled line of values, one value per x position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// X axis tick labels together with the series plotted against them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotData {
    pub x_ticks: Vec<String>,
    pub series: Vec<Series>,
}

/// Compile a filter that must match at the start of the subject.
pub fn start_anchored(pattern: &str) -> SurveyResult<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

/// Quality of every network matching `filter`, one point per scan.
///
/// A network absent from a scan scores 0.0 there. Series are ordered by ESSID.
pub fn quality_series(
    scans: &[ScanRecord],
    observations: &[StoredObservation],
    filter: &Regex,
) -> PlotData {
    let position: HashMap<i64, usize> = scans
        .iter()
        .enumerate()
        .map(|(idx, scan)| (scan.id, idx))
        .collect();

    let mut networks: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for stored in observations {
        let essid = stored.observation.essid.as_str();
        if !filter.is_match(essid) {
            continue;
        }
        let Some(&idx) = position.get(&stored.scan_id) else {
            continue;
        };
        let values = networks
            .entry(essid)
            .or_insert_with(|| vec![0.0; scans.len()]);
        values[idx] = stored.observation.quality;
    }

    PlotData {
        x_ticks: scans
            .iter()
            .map(|scan| format!("{}\n{}", scan.description, scan.time.format("%Y-%m-%d %H:%M:%S")))
            .collect(),
        series: networks
            .into_iter()
            .map(|(essid, values)| Series {
                label: essid.to_string(),
                values,
            })
            .collect(),
    }
}

/// Download speed of samples whose exit IP matches `filter`.
///
/// A tick is labelled with the exit IP only where it changes from the
/// previous plotted sample.
pub fn speed_series(samples: &[SpeedSample], filter: &Regex, label: &str) -> PlotData {
    let mut values = Vec::new();
    let mut x_ticks = Vec::new();
    let mut last_ip: Option<Option<&str>> = None;

    for sample in samples {
        let ip = sample.exit_ip.as_deref().map(str::trim);
        if !filter.is_match(ip.unwrap_or("")) {
            continue;
        }
        values.push(sample.bytes_per_second);
        if last_ip == Some(ip) {
            x_ticks.push(String::new());
        } else {
            x_ticks.push(ip.unwrap_or("unknown").to_string());
        }
        last_ip = Some(ip);
    }

    PlotData {
        x_ticks,
        series: vec![Series {
            label: label.to_string(),
            values,
        }],
    }
}
