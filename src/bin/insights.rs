//! Insights CLI - Command-line interface for Glyco Insights
//!
//! Commands:
//! - report: Compute a full insights report from an input document
//! - classify: Classify a single reading
//! - timeline: Print only the daily timeline and consistency summary
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use glyco_insights::classifier::{classify, MetricReading};
use glyco_insights::config::{parse_window, InsightsConfig};
use glyco_insights::pipeline::{InsightsEngine, InsightsInput};
use glyco_insights::types::{ConsistencyReport, DailyTimelineEntry, MetricKind};
use glyco_insights::{ComputeError, INSIGHTS_VERSION, PRODUCER_NAME};

/// Insights - Health insights derivation engine
#[derive(Parser)]
#[command(name = "insights")]
#[command(author = "Glyco Health")]
#[command(version = INSIGHTS_VERSION)]
#[command(about = "Derive dashboard insights from health records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a full insights report
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Trend window, e.g. "14days" (overrides config and input)
        #[arg(long)]
        window: Option<String>,

        /// Load engine configuration from file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Classify a single reading
    Classify {
        /// Metric to classify
        #[arg(value_enum)]
        kind: MetricArg,

        /// Reading value (systolic for blood pressure)
        value: f64,

        /// Diastolic value for blood pressure
        #[arg(long)]
        diastolic: Option<f64>,
    },

    /// Print the daily timeline and consistency summary
    Timeline {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Trend window, e.g. "7days"
        #[arg(long)]
        window: Option<String>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    /// Body mass index (kg/m²)
    Bmi,
    /// HbA1c (%)
    Hba1c,
    /// Fasting plasma glucose (mg/dL)
    FastingGlucose,
    /// Blood pressure (systolic, with --diastolic)
    BloodPressure,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Bmi => MetricKind::Bmi,
            MetricArg::Hba1c => MetricKind::Hba1c,
            MetricArg::FastingGlucose => MetricKind::FastingGlucose,
            MetricArg::BloodPressure => MetricKind::BloodPressure,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), InsightsCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            window,
            config,
            pretty,
        } => cmd_report(&input, &output, window.as_deref(), config.as_deref(), pretty),

        Commands::Classify {
            kind,
            value,
            diastolic,
        } => cmd_classify(kind, value, diastolic),

        Commands::Timeline { input, window } => cmd_timeline(&input, window.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    window: Option<&str>,
    config: Option<&Path>,
    pretty: bool,
) -> Result<(), InsightsCliError> {
    let engine = match config {
        Some(path) => {
            let config = InsightsConfig::from_json(&fs::read_to_string(path)?)?;
            InsightsEngine::with_config(config)?
        }
        None => InsightsEngine::new(),
    };
    let request = load_input(input, window)?;

    let report = engine.compute(&request, Utc::now())?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    write_output(output, &rendered)
}

fn cmd_classify(
    kind: MetricArg,
    value: f64,
    diastolic: Option<f64>,
) -> Result<(), InsightsCliError> {
    let reading = MetricReading::from_parts(kind.into(), value, diastolic)?;
    let classified = classify(reading)?;
    println!("{}", serde_json::to_string_pretty(&classified)?);
    Ok(())
}

fn cmd_timeline(input: &Path, window: Option<&str>) -> Result<(), InsightsCliError> {
    let request = load_input(input, window)?;
    let report = InsightsEngine::new().compute(&request, Utc::now())?;

    let view = TimelineView {
        window_days: report.window_days,
        anchor_date: report.anchor_date,
        timeline: report.timeline,
        consistency: report.consistency,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), InsightsCliError> {
    let (config_check, loaded) = check_config(config);
    let checks = vec![
        config_check,
        check_engine(loaded.unwrap_or_default()),
        DoctorCheck::new(
            "stdin",
            CheckStatus::Ok,
            if atty::is(atty::Stream::Stdin) {
                "terminal; pass --input <file> or pipe a snapshot"
            } else {
                "piped; `--input -` will read it"
            },
        ),
    ];

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: INSIGHTS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {}", report.producer, report.version);
        for check in &report.checks {
            println!("  {:<5} {:<7} {}", check.status.as_str(), check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| c.status == CheckStatus::Error) {
        Err(InsightsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config(path: Option<&Path>) -> (DoctorCheck, Option<InsightsConfig>) {
    let Some(path) = path else {
        return (
            DoctorCheck::new("config", CheckStatus::Ok, "none given; using defaults"),
            None,
        );
    };

    let loaded = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| InsightsConfig::from_json(&content).map_err(|e| e.to_string()));

    match loaded {
        Ok(config) => (
            DoctorCheck::new(
                "config",
                CheckStatus::Ok,
                format!(
                    "{}: {} day window, HbA1c stale after {} days",
                    path.display(),
                    config.window_days,
                    config.hba1c_stale_after_days
                ),
            ),
            Some(config),
        ),
        Err(e) => (
            DoctorCheck::new("config", CheckStatus::Error, format!("{}: {e}", path.display())),
            None,
        ),
    }
}

/// Run an empty snapshot through the engine
fn check_engine(config: InsightsConfig) -> DoctorCheck {
    let window_days = config.window_days;
    let result = InsightsEngine::with_config(config)
        .and_then(|engine| engine.compute(&InsightsInput::default(), Utc::now()));

    match result {
        Ok(report) if report.timeline.len() == window_days as usize => DoctorCheck::new(
            "engine",
            CheckStatus::Ok,
            format!("empty snapshot -> {} day timeline", report.timeline.len()),
        ),
        Ok(report) => DoctorCheck::new(
            "engine",
            CheckStatus::Error,
            format!(
                "expected {window_days} timeline days, got {}",
                report.timeline.len()
            ),
        ),
        Err(e) => DoctorCheck::new("engine", CheckStatus::Error, e.to_string()),
    }
}

/// Read the input document; `--window` wins over the document's own window
fn load_input(path: &Path, window: Option<&str>) -> Result<InsightsInput, InsightsCliError> {
    let raw = read_source(path)?;
    if raw.trim().is_empty() {
        return Err(InsightsCliError::EmptyInput);
    }

    let mut input: InsightsInput = serde_json::from_str(&raw)?;
    if let Some(window) = window {
        input.window_days = Some(parse_window(window)?);
    }
    Ok(input)
}

fn read_source(path: &Path) -> Result<String, InsightsCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, content: &str) -> Result<(), InsightsCliError> {
    if path.to_string_lossy() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", content)?;
        handle.flush()?;
    } else {
        fs::write(path, format!("{}\n", content))?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum InsightsCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    EmptyInput,
    DoctorFailed,
}

impl From<io::Error> for InsightsCliError {
    fn from(e: io::Error) -> Self {
        InsightsCliError::Io(e)
    }
}

impl From<ComputeError> for InsightsCliError {
    fn from(e: ComputeError) -> Self {
        InsightsCliError::Compute(e)
    }
}

impl From<serde_json::Error> for InsightsCliError {
    fn from(e: serde_json::Error) -> Self {
        InsightsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<InsightsCliError> for CliError {
    fn from(e: InsightsCliError) -> Self {
        match e {
            InsightsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            InsightsCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidWindow(_) => {
                        ("INVALID_WINDOW", "Use a window of 1 to 3650 days, e.g. 14days")
                    }
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'insights doctor --config <file>' for details")
                    }
                    ComputeError::NonFiniteValue { .. } => {
                        ("NON_FINITE_VALUE", "Readings must be finite numbers")
                    }
                    ComputeError::DateParseError(_) => {
                        ("DATE_ERROR", "Use ISO dates such as 2024-01-15")
                    }
                    _ => ("COMPUTE_ERROR", "Ensure input matches the insights input format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            InsightsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            InsightsCliError::EmptyInput => CliError {
                code: "EMPTY_INPUT".to_string(),
                message: "Input document is empty".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            InsightsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct TimelineView {
    window_days: u32,
    anchor_date: String,
    timeline: Vec<DailyTimelineEntry>,
    consistency: ConsistencyReport,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Error,
}

impl CheckStatus {
    fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Error => "error",
        }
    }
}
