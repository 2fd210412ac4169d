//! Report parser: turns one raw scan report into ordered observations.

use crate::extract::{extract_field, Field};
use crate::types::{MalformedInput, MalformedKind, Observation};

/// The cell currently under construction.
#[derive(Debug)]
struct OpenCell {
    /// Line number and text of the `Cell NN - Address:` line.
    started_at: (usize, String),
    address: String,
    frequency: Option<(String, u32)>,
    quality: Option<(f64, String)>,
}

impl OpenCell {
    fn new(line_number: usize, line: &str, address: String) -> Self {
        Self {
            started_at: (line_number, line.to_string()),
            address,
            frequency: None,
            quality: None,
        }
    }

    fn finish(self, essid: String) -> Result<Observation, MalformedKind> {
        let (frequency, channel) = self
            .frequency
            .ok_or(MalformedKind::MissingField("frequency"))?;
        let (quality, signal_level) = self
            .quality
            .ok_or(MalformedKind::MissingField("quality"))?;
        Ok(Observation {
            address: self.address,
            essid,
            quality,
            signal_level,
            frequency,
            channel,
        })
    }
}

/// Parser state: either between cells or inside one.
#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Open(OpenCell),
}

/// Parse the full text of one scan report.
///
/// Cells are returned in the order their `Cell NN` lines appear. A report
/// with no cells yields an empty vector. Parsing stops at the first
/// malformed line and nothing is returned for the report.
pub fn parse(raw: &str) -> Result<Vec<Observation>, MalformedInput> {
    let mut observations = Vec::new();
    let mut state = State::Idle;

    for (index, raw_line) in raw.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        let fail = |kind| MalformedInput::new(kind, line_number, line);

        let Some(field) = extract_field(line).map_err(fail)? else {
            continue;
        };

        state = match (std::mem::take(&mut state), field) {
            (State::Idle, Field::CellStart { address }) => {
                State::Open(OpenCell::new(line_number, line, address))
            }
            (State::Open(_), Field::CellStart { .. }) => {
                return Err(fail(MalformedKind::DuplicateOpenRecord));
            }
            (State::Idle, _) => return Err(fail(MalformedKind::OrphanField)),
            (State::Open(mut cell), Field::Frequency { frequency, channel }) => {
                cell.frequency = Some((frequency, channel));
                State::Open(cell)
            }
            (State::Open(mut cell), Field::QualitySignal { quality, signal_level }) => {
                cell.quality = Some((quality, signal_level));
                State::Open(cell)
            }
            (State::Open(cell), Field::Essid(essid)) => {
                let observation = cell.finish(essid).map_err(fail)?;
                tracing::debug!(
                    "Cell {} ({:?}) closed at line {line_number}",
                    observation.address,
                    observation.essid
                );
                observations.push(observation);
                State::Idle
            }
        };
    }

    if let State::Open(cell) = state {
        let (line_number, line) = cell.started_at;
        return Err(MalformedInput::new(
            MalformedKind::IncompleteRecord,
            line_number,
            &line,
        ));
    }

    tracing::trace!("Parsed {} observations", observations.len());
    Ok(observations)
}
