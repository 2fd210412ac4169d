//! wifi-survey — entry point.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use wifi_survey::SurveyStore;
use wifi_survey_cli::config::{resolve_speed_db, resolve_survey_db};
use wifi_survey_cli::plot::{plot_quality, plot_speed};
use wifi_survey_cli::session::{IwlistScanner, ScanSession};
use wifi_survey_cli::speed::SpeedProbe;

#[derive(Parser)]
#[command(
    name = "wifi-survey",
    about = "Record wireless scans and connection speed samples, and plot them over time",
    version
)]
struct Cli {
    /// Path to the SQLite database.
    /// Defaults to $WIFI_SURVEY_DB / $WIFI_SPEED_DB, then plan-b-survey.db / plan-b-tor-speed.db.
    #[arg(long, global = true)]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan with `sudo iwlist <interface> scan` and store the result.
    Scan {
        /// Wireless interface (e.g. wlan0).
        interface: String,
        /// Where/when the scan was taken.
        description: String,
    },

    /// Parse a stored scan again and replace its cells.
    Reparse {
        /// Scan ID as shown by `scans`.
        scan_id: i64,
    },

    /// Parse iwlist output from a file (or stdin) and print the cells as JSON.
    Parse {
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,
    },

    /// List stored scans.
    Scans,

    /// Plot network quality across scans.
    Plot {
        /// ESSID filter, matched at the start ('.*' for all).
        network_regex: String,
        /// Output SVG file.
        #[arg(short, long, default_value = "survey.svg")]
        output: PathBuf,
    },

    /// Record exit IP and/or download speed.
    Speed {
        /// URL returning the exit IP address
        /// (e.g. https://plan-b.digitale-gesellschaft.ch/testing/ip.php).
        #[arg(long, value_name = "URL")]
        get_ip: Option<String>,
        /// URL of a test file to time
        /// (e.g. https://plan-b.digitale-gesellschaft.ch/testing/testfile-10mb.img).
        #[arg(long, value_name = "URL")]
        testfile: Option<String>,
        /// Proxy for all requests (e.g. socks5://localhost:9050).
        #[arg(long)]
        proxy: Option<String>,
    },

    /// Plot recorded download speed.
    SpeedPlot {
        /// Exit IP filter, matched at the start ('.*' for all).
        ip_regex: String,
        /// Output SVG file.
        #[arg(short, long, default_value = "speed.svg")]
        output: PathBuf,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let database = cli.database.as_deref();

    match cli.command {
        Commands::Scan {
            interface,
            description,
        } => {
            let mut session = open_session(database)?;
            let outcome = session
                .run(&interface, &description)
                .with_context(|| format!("scan of {interface} failed"))?;
            println!(
                "Scan {}: {} cells recorded",
                outcome.scan.id,
                outcome.observations.len()
            );
        }

        Commands::Reparse { scan_id } => {
            let mut session = open_session(database)?;
            let outcome = session.reparse(scan_id)?;
            println!(
                "Scan {}: {} cells recorded",
                outcome.scan.id,
                outcome.observations.len()
            );
        }

        Commands::Parse { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let observations = wifi_survey::parse(&raw)?;
            println!("{}", serde_json::to_string_pretty(&observations)?);
        }

        Commands::Scans => {
            let store = open_store(resolve_survey_db(database))?;
            for scan in store.scans()? {
                let cells = store.observations_for_scan(scan.id)?.len();
                println!(
                    "{:>5}  {}  {:>3} cells  {}",
                    scan.id,
                    scan.time
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S"),
                    cells,
                    scan.description
                );
            }
        }

        Commands::Plot {
            network_regex,
            output,
        } => {
            let store = open_store(resolve_survey_db(database))?;
            plot_quality(&store, &network_regex, &output)?;
            println!("Wrote {}", output.display());
        }

        Commands::Speed {
            get_ip,
            testfile,
            proxy,
        } => {
            if get_ip.is_none() && testfile.is_none() {
                bail!("nothing to do: pass --get-ip and/or --testfile");
            }
            let store = open_store(resolve_speed_db(database))?;
            let probe = SpeedProbe::new(proxy.as_deref())?;

            let mut ip = None;
            if let Some(url) = get_ip {
                ip = Some(probe.determine_ip(&url, &store).await?);
            }
            if let Some(url) = testfile {
                let sample = probe.determine_speed(&url, ip.as_deref(), &store).await?;
                println!(
                    "{} B/s via {}",
                    sample.bytes_per_second.round(),
                    sample.exit_ip.as_deref().unwrap_or("unknown")
                );
            } else if let Some(ip) = ip {
                println!("{ip}");
            }
        }

        Commands::SpeedPlot { ip_regex, output } => {
            let path = resolve_speed_db(database);
            let store = open_store(path.clone())?;
            plot_speed(&store, &ip_regex, &path.display().to_string(), &output)?;
            println!("Wrote {}", output.display());
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "wifi-survey", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn open_store(path: PathBuf) -> anyhow::Result<SurveyStore> {
    SurveyStore::open(&path).with_context(|| format!("cannot open database {}", path.display()))
}

fn open_session(database: Option<&str>) -> anyhow::Result<ScanSession<IwlistScanner>> {
    let store = open_store(resolve_survey_db(database))?;
    Ok(ScanSession::new(store, IwlistScanner::new()))
}
