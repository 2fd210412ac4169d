//! Line-level field extractors for `iwlist <iface> scan` output.
//!
//! Each extractor looks at a single trimmed line and either declines
//! (`Ok(None)`), decodes one field group (`Ok(Some(_))`), or reports that the
//! line is its field group but the payload is malformed (`Err(_)`).
//! The patterns are mutually exclusive, so the fixed trial order only
//! matters for speed.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::MalformedKind;

/// A decoded field group.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    CellStart {
        address: String,
    },
    Frequency {
        frequency: String,
        channel: u32,
    },
    QualitySignal {
        quality: f64,
        signal_level: String,
    },
    Essid(String),
}

/// Result of running one extractor over one line.
pub type Extracted = Result<Option<Field>, MalformedKind>;

/// Extractors in the order they are tried.
const EXTRACTORS: [fn(&str) -> Extracted; 4] = [
    extract_cell_start,
    extract_frequency,
    extract_quality_signal,
    extract_essid,
];

const ESSID_PREFIX: &str = "ESSID:\"";

fn cell_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Cell \d+ - Address: (.+)$").expect("cell regex is valid"))
}

fn frequency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Frequency:(\d+(?:\.\d+)?) GHz \(Channel ([^)]*)\)$")
            .expect("frequency regex is valid")
    })
}

fn quality_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Quality=([^/\s]*)/(\S*)\s+Signal level=(.+?) dBm$")
            .expect("quality regex is valid")
    })
}

/// Run the extractors over `line` in order; the first one that does not
/// decline decides the outcome.
pub fn extract_field(line: &str) -> Extracted {
    for extractor in EXTRACTORS {
        if let Some(field) = extractor(line)? {
            return Ok(Some(field));
        }
    }
    Ok(None)
}

/// `Cell 01 - Address: AA:BB:CC:DD:EE:FF`
pub fn extract_cell_start(line: &str) -> Extracted {
    Ok(cell_start_re().captures(line).map(|caps| Field::CellStart {
        address: caps[1].to_string(),
    }))
}

/// `Frequency:2.437 GHz (Channel 6)`
pub fn extract_frequency(line: &str) -> Extracted {
    let Some(caps) = frequency_re().captures(line) else {
        return Ok(None);
    };
    let channel = caps[2]
        .parse::<u32>()
        .map_err(|_| MalformedKind::InvalidChannel)?;
    Ok(Some(Field::Frequency {
        frequency: caps[1].to_string(),
        channel,
    }))
}

/// `Quality=51/70  Signal level=-59 dBm`
pub fn extract_quality_signal(line: &str) -> Extracted {
    let Some(caps) = quality_re().captures(line) else {
        return Ok(None);
    };
    let numerator = caps[1]
        .parse::<u32>()
        .map_err(|_| MalformedKind::InvalidQualityRatio)?;
    let denominator = caps[2]
        .parse::<u32>()
        .map_err(|_| MalformedKind::InvalidQualityRatio)?;
    if denominator == 0 {
        return Err(MalformedKind::InvalidQualityRatio);
    }
    Ok(Some(Field::QualitySignal {
        quality: f64::from(numerator) / f64::from(denominator),
        signal_level: caps[3].to_string(),
    }))
}

/// `ESSID:"HomeNet"`; an empty name (`ESSID:""`) is a hidden network.
pub fn extract_essid(line: &str) -> Extracted {
    let Some(rest) = line.strip_prefix(ESSID_PREFIX) else {
        return Ok(None);
    };
    match rest.strip_suffix('"') {
        Some(essid) => Ok(Some(Field::Essid(essid.to_string()))),
        None => Err(MalformedKind::UnterminatedQuote),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_start() {
        let field = extract_cell_start("Cell 01 - Address: AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(
            field,
            Some(Field::CellStart {
                address: "AA:BB:CC:DD:EE:FF".into()
            })
        );
        assert_eq!(extract_cell_start("Cell - Address: AA").unwrap(), None);
        assert_eq!(extract_cell_start("wlan0     Scan completed :").unwrap(), None);
    }

    #[test]
    fn test_frequency() {
        let field = extract_frequency("Frequency:5.18 GHz (Channel 36)").unwrap();
        assert_eq!(
            field,
            Some(Field::Frequency {
                frequency: "5.18".into(),
                channel: 36
            })
        );
    }

    #[test]
    fn test_frequency_bad_channel() {
        assert_eq!(
            extract_frequency("Frequency:2.437 GHz (Channel six)"),
            Err(MalformedKind::InvalidChannel)
        );
        assert_eq!(
            extract_frequency("Frequency:2.437 GHz (Channel )"),
            Err(MalformedKind::InvalidChannel)
        );
    }

    #[test]
    fn test_frequency_declines_other_lines() {
        assert_eq!(extract_frequency("Channel:6").unwrap(), None);
        assert_eq!(extract_frequency("Frequency:2.437 GHz").unwrap(), None);
        assert_eq!(extract_frequency("Frequency:abc GHz (Channel 6)").unwrap(), None);
        assert_eq!(extract_frequency("Frequency:2.4.1 GHz (Channel 6)").unwrap(), None);
        assert_eq!(extract_frequency("Frequency: GHz (Channel 6)").unwrap(), None);
    }

    #[test]
    fn test_quality_signal() {
        let field = extract_quality_signal("Quality=70/70  Signal level=-38 dBm").unwrap();
        assert_eq!(
            field,
            Some(Field::QualitySignal {
                quality: 1.0,
                signal_level: "-38".into()
            })
        );
    }

    #[test]
    fn test_quality_above_one_passes_through() {
        let field = extract_quality_signal("Quality=80/70  Signal level=-30 dBm").unwrap();
        match field {
            Some(Field::QualitySignal { quality, .. }) => {
                assert!((quality - 80.0 / 70.0).abs() < 1e-12);
                assert!(quality > 1.0);
            }
            other => panic!("unexpected field: {other:?}"),
        }
    }

    #[test]
    fn test_quality_zero_denominator() {
        assert_eq!(
            extract_quality_signal("Quality=0/0  Signal level=-90 dBm"),
            Err(MalformedKind::InvalidQualityRatio)
        );
    }

    #[test]
    fn test_quality_non_numeric() {
        assert_eq!(
            extract_quality_signal("Quality=x/70  Signal level=-90 dBm"),
            Err(MalformedKind::InvalidQualityRatio)
        );
        assert_eq!(
            extract_quality_signal("Quality=40/seventy  Signal level=-90 dBm"),
            Err(MalformedKind::InvalidQualityRatio)
        );
    }

    #[test]
    fn test_essid() {
        assert_eq!(
            extract_essid("ESSID:\"Cafe \"Bar\"\"").unwrap(),
            Some(Field::Essid("Cafe \"Bar\"".into()))
        );
        assert_eq!(extract_essid("ESSID:\"\"").unwrap(), Some(Field::Essid(String::new())));
        assert_eq!(extract_essid("ESSID:off/any").unwrap(), None);
    }

    #[test]
    fn test_essid_unterminated() {
        assert_eq!(extract_essid("ESSID:\"HomeNet"), Err(MalformedKind::UnterminatedQuote));
        assert_eq!(extract_essid("ESSID:\""), Err(MalformedKind::UnterminatedQuote));
    }

    #[test]
    fn test_extract_field_ignores_unknown() {
        assert_eq!(extract_field("Mode:Master").unwrap(), None);
        assert_eq!(extract_field("").unwrap(), None);
        assert!(matches!(
            extract_field("ESSID:\"x\"").unwrap(),
            Some(Field::Essid(_))
        ));
    }
}
