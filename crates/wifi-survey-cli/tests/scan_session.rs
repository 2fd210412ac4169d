//! Scan session integration tests: capture, persistence, failure handling.

use std::cell::RefCell;

use wifi_survey::{MalformedKind, SurveyError, SurveyStore};
use wifi_survey_cli::plot::plot_quality;
use wifi_survey_cli::session::{ScanSession, ScanSource, SessionError, SessionResult};

// ─────────────────────── helpers ───────────────────────

/// Replays canned reports in order, one per scan.
struct Replay {
    reports: RefCell<Vec<String>>,
}

impl Replay {
    fn new(reports: &[&str]) -> Self {
        let mut reports: Vec<String> = reports.iter().map(|r| r.to_string()).collect();
        reports.reverse();
        Self {
            reports: RefCell::new(reports),
        }
    }
}

impl ScanSource for Replay {
    fn scan(&self, _interface: &str) -> SessionResult<String> {
        self.reports
            .borrow_mut()
            .pop()
            .ok_or_else(|| SessionError::Command {
                program: "replay".into(),
                status: "exhausted".into(),
                stderr: String::new(),
            })
    }
}

fn report(cells: &[(&str, &str, &str)]) -> String {
    let mut raw = String::from("wlan0     Scan completed :\n");
    for (i, (address, essid, quality)) in cells.iter().enumerate() {
        raw.push_str(&format!(
            "          Cell {:02} - Address: {address}\n\
             \x20                   Frequency:2.462 GHz (Channel 11)\n\
             \x20                   Quality={quality}  Signal level=-61 dBm\n\
             \x20                   ESSID:\"{essid}\"\n",
            i + 1
        ));
    }
    raw
}

fn session(reports: &[&str]) -> ScanSession<Replay> {
    ScanSession::new(SurveyStore::open_in_memory().unwrap(), Replay::new(reports))
}

// ─────────────────────── tests ───────────────────────

#[test]
fn test_run_stores_scan_and_cells() {
    let raw = report(&[
        ("AA:AA:AA:AA:AA:01", "cafe", "35/70"),
        ("AA:AA:AA:AA:AA:02", "office", "70/70"),
    ]);
    let mut session = session(&[&raw]);

    let outcome = session.run("wlan0", "front door").unwrap();
    assert_eq!(outcome.observations.len(), 2);
    assert_eq!(outcome.scan.description, "front door");

    let store = session.store();
    assert_eq!(store.scan(outcome.scan.id).unwrap().data, raw);
    let stored = store.observations_for_scan(outcome.scan.id).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].observation.essid, "cafe");
    assert_eq!(stored[0].observation.quality, 0.5);
    assert_eq!(stored[1].observation.quality, 1.0);
}

#[test]
fn test_malformed_report_keeps_raw_scan_only() {
    let good = report(&[("AA:AA:AA:AA:AA:01", "cafe", "35/70")]);
    let bad = "Cell 01 - Address: AA:AA:AA:AA:AA:01\nCell 02 - Address: AA:AA:AA:AA:AA:02\n";
    let mut session = session(&[&good, bad]);

    session.run("wlan0", "first").unwrap();
    let err = session.run("wlan0", "second").unwrap_err();
    match err {
        SessionError::Survey(SurveyError::Malformed(m)) => {
            assert_eq!(m.kind, MalformedKind::DuplicateOpenRecord);
            assert_eq!(m.line_number, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    let store = session.store();
    let scans = store.scans().unwrap();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[1].data, bad);
    assert!(store.observations_for_scan(scans[1].id).unwrap().is_empty());
    assert_eq!(store.observations_for_scan(scans[0].id).unwrap().len(), 1);
}

#[test]
fn test_source_failure_stores_nothing() {
    let mut session = session(&[]);
    assert!(matches!(
        session.run("wlan0", "nowhere"),
        Err(SessionError::Command { .. })
    ));
    assert!(session.store().scans().unwrap().is_empty());
}

#[test]
fn test_empty_report_is_a_scan_with_no_cells() {
    let mut session = session(&["wlan0     No scan results\n"]);
    let outcome = session.run("wlan0", "basement").unwrap();
    assert!(outcome.observations.is_empty());
    assert_eq!(session.store().scans().unwrap().len(), 1);
}

#[test]
fn test_reparse_replaces_cells() {
    let raw = report(&[("AA:AA:AA:AA:AA:01", "cafe", "35/70")]);
    let mut session = session(&[&raw]);
    let first = session.run("wlan0", "desk").unwrap();

    let again = session.reparse(first.scan.id).unwrap();
    assert_eq!(again.observations, first.observations);
    assert_eq!(
        session
            .store()
            .observations_for_scan(first.scan.id)
            .unwrap()
            .len(),
        1
    );
    assert!(matches!(
        session.reparse(999),
        Err(SessionError::Survey(SurveyError::ScanNotFound(999)))
    ));
}

#[test]
fn test_plot_after_scans() {
    let first = report(&[
        ("AA:AA:AA:AA:AA:01", "cafe", "35/70"),
        ("AA:AA:AA:AA:AA:02", "office", "7/70"),
    ]);
    let second = report(&[("AA:AA:AA:AA:AA:01", "cafe", "70/70")]);
    let mut session = session(&[&first, &second]);
    session.run("wlan0", "hall").unwrap();
    session.run("wlan0", "roof").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("survey.svg");
    let chart = plot_quality(session.store(), "caf", &output).unwrap();

    assert_eq!(chart.data.series.len(), 1);
    assert_eq!(chart.data.series[0].values, vec![0.5, 1.0]);
    assert!(chart.data.x_ticks[0].starts_with("hall\n"));
    assert!(std::fs::read_to_string(&output).unwrap().contains("cafe"));
}

#[test]
fn test_plot_rejects_bad_filter() {
    let session = session(&[]);
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        plot_quality(session.store(), "(", &dir.path().join("x.svg")),
        Err(SurveyError::InvalidPattern(_))
    ));
}
