//! Scan session: capture a report, persist it, parse it, persist the cells.

use std::process::Command;

use wifi_survey::{parse, Observation, ScanRecord, SurveyError, SurveyStore};

/// Errors from running a scan session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Scan output is not valid UTF-8")]
    Encoding,

    #[error(transparent)]
    Survey(#[from] SurveyError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Something that produces the raw text of one wireless scan.
pub trait ScanSource {
    fn scan(&self, interface: &str) -> SessionResult<String>;
}

/// Runs `sudo iwlist <interface> scan`.
pub struct IwlistScanner {
    program: String,
    args: Vec<String>,
}

impl IwlistScanner {
    pub fn new() -> Self {
        Self::with_command("sudo", &["iwlist"])
    }

    /// Use another command line; the interface and `scan` are appended to it.
    pub fn with_command(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Default for IwlistScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSource for IwlistScanner {
    fn scan(&self, interface: &str) -> SessionResult<String> {
        tracing::debug!("Running {} {:?} {interface} scan", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(interface)
            .arg("scan")
            .output()
            .map_err(|source| SessionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            tracing::warn!("{}: {stderr}", self.program);
        }
        if !stderr.is_empty() || !output.status.success() {
            return Err(SessionError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|_| SessionError::Encoding)
    }
}

/// Outcome of recording one report.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan: ScanRecord,
    pub observations: Vec<Observation>,
}

/// Drives a scan source and the survey store.
pub struct ScanSession<S> {
    store: SurveyStore,
    source: S,
}

impl<S: ScanSource> ScanSession<S> {
    pub fn new(store: SurveyStore, source: S) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &SurveyStore {
        &self.store
    }

    /// Scan `interface` and record the result under `description`.
    pub fn run(&mut self, interface: &str, description: &str) -> SessionResult<ScanOutcome> {
        let raw = self.source.scan(interface)?;
        self.record(description, &raw)
    }

    /// Persist a raw report, then parse it and persist its cells.
    ///
    /// The raw report is kept even when parsing fails; no cells are stored
    /// for it in that case.
    pub fn record(&mut self, description: &str, raw: &str) -> SessionResult<ScanOutcome> {
        let scan = self.store.insert_scan(description, raw)?;
        tracing::info!("Stored scan {} ({description})", scan.id);

        let observations = parse(raw).map_err(|e| {
            tracing::error!("Scan {} not analyzed: {e}", scan.id);
            SurveyError::from(e)
        })?;
        self.store.insert_observations(scan.id, &observations)?;
        tracing::info!("Scan {}: {} cells", scan.id, observations.len());

        Ok(ScanOutcome { scan, observations })
    }

    /// Parse a stored report again and replace its cells.
    pub fn reparse(&mut self, scan_id: i64) -> SessionResult<ScanOutcome> {
        let scan = self.store.scan(scan_id)?;
        let observations = parse(&scan.data).map_err(SurveyError::from)?;
        self.store.replace_observations(scan.id, &observations)?;
        tracing::info!("Reparsed scan {}: {} cells", scan.id, observations.len());
        Ok(ScanOutcome { scan, observations })
    }
}
