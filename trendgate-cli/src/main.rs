//! TrendGate CLI: evaluate candle files and inspect level configuration.
//!
//! Commands:
//! - `evaluate`: score one or more OHLC CSV files and print JSON assessments
//! - `levels`: print the validated level set and its fingerprint
//!
//! Logs go to stderr (`RUST_LOG`, default `trendgate=info`); stdout carries
//! only JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use trendgate_core::{Assessment, Candle, Engine, EngineConfig, EvaluationInput, LevelConfig};

#[derive(Parser)]
#[command(
    name = "trendgate",
    about = "TrendGate CLI: multi-level trend scoring with pullback validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate OHLC candle files and print one JSON assessment per file.
    Evaluate {
        /// CSV files with an `open,high,low,close` header (other columns ignored).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to a TOML config file. Defaults to the standard 50/20/9 levels.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Current price. Defaults to the last close of each file.
        #[arg(long)]
        price: Option<f64>,

        /// Pretty-print the JSON output.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the validated level set with its fingerprint.
    Levels {
        /// Path to a TOML config file. Defaults to the standard 50/20/9 levels.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trendgate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            files,
            config,
            price,
            pretty,
        } => run_evaluate(&files, config.as_deref(), price, pretty),
        Commands::Levels { config } => run_levels(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EngineConfig::from_toml_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))
}

#[derive(Debug, Deserialize)]
struct CsvCandle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Parse candles from CSV text. Row numbers in errors count the header as
/// row 1.
fn parse_candles(reader: impl Read) -> Result<Vec<Candle>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut candles = Vec::new();

    for (index, result) in csv_reader.deserialize().enumerate() {
        let row_number = index + 2;
        let row: CsvCandle = result.with_context(|| format!("failed to parse row {row_number}"))?;
        let candle = Candle::new(row.open, row.high, row.low, row.close);
        if !candle.is_sane() {
            bail!(
                "row {row_number}: invalid candle (open {}, high {}, low {}, close {})",
                row.open,
                row.high,
                row.low,
                row.close
            );
        }
        candles.push(candle);
    }

    Ok(candles)
}

fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let candles = parse_candles(std::io::BufReader::new(file))
        .with_context(|| format!("failed to load candles from {}", path.display()))?;
    tracing::debug!(file = %path.display(), candles = candles.len(), "candles loaded");
    Ok(candles)
}

#[derive(Serialize)]
struct FileAssessment<'a> {
    file: String,
    #[serde(flatten)]
    assessment: &'a Assessment,
}

fn evaluate_file(engine: &Engine, path: &Path, price: Option<f64>) -> Result<Assessment> {
    let candles = load_candles(path)?;
    let mut input = EvaluationInput::new(&candles);
    if let Some(price) = price {
        input = input.with_price(price);
    }
    let assessment = engine.evaluate(&input);
    tracing::info!(
        file = %path.display(),
        effectiveness = assessment.effectiveness,
        direction = %assessment.direction,
        vetoed = assessment.is_vetoed(),
        "file evaluated"
    );
    Ok(assessment)
}

fn run_evaluate(files: &[PathBuf], config: Option<&Path>, price: Option<f64>, pretty: bool) -> Result<()> {
    if let Some(price) = price {
        if !(price.is_finite() && price > 0.0) {
            bail!("--price must be a positive number, got {price}");
        }
    }

    let engine = Engine::from_config(load_config(config)?)?;
    tracing::info!(
        levels = engine.levels().len(),
        fingerprint = %engine.levels().fingerprint(),
        "configuration loaded"
    );

    let results: Vec<Result<Assessment>> = files
        .par_iter()
        .map(|path| evaluate_file(&engine, path, price))
        .collect();

    let mut failures = 0;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(assessment) => {
                let doc = FileAssessment {
                    file: path.display().to_string(),
                    assessment: &assessment,
                };
                println!("{}", to_json(&doc, pretty)?);
            }
            Err(e) => {
                eprintln!("Error for {}: {e:#}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} files failed", files.len());
    }
    Ok(())
}

#[derive(Serialize)]
struct LevelsReport<'a> {
    version: u64,
    fingerprint: String,
    levels: &'a [LevelConfig],
}

fn run_levels(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let report = LevelsReport {
        version: config.levels.version(),
        fingerprint: config.levels.fingerprint(),
        levels: config.levels.levels(),
    };
    println!("{}", to_json(&report, true)?);
    Ok(())
}

fn to_json(value: &impl Serialize, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use trendgate_core::Direction;

    fn rising_csv(n: usize) -> String {
        let mut csv = String::from("date,open,high,low,close,volume\n");
        for i in 0..n {
            let close = 100.0 + 0.1 * i as f64;
            let open = close - 0.1;
            csv.push_str(&format!(
                "2024-01-{:02},{open},{},{},{close},1000\n",
                i % 28 + 1,
                close + 0.0125,
                open - 0.0125
            ));
        }
        csv
    }

    #[test]
    fn parses_candles_ignoring_extra_columns() {
        let candles = parse_candles(rising_csv(5).as_bytes()).unwrap();
        assert_eq!(candles.len(), 5);
        assert_eq!(candles[0].close, 100.0);
        assert!(candles.iter().all(Candle::is_sane));
    }

    #[test]
    fn insane_row_reports_row_number() {
        let csv = "open,high,low,close\n100,101,99,100.5\n100,99,101,100\n";
        let err = parse_candles(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 3"), "{err}");
    }

    #[test]
    fn malformed_number_is_an_error() {
        let csv = "open,high,low,close\n100,abc,99,100\n";
        let err = parse_candles(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn evaluates_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rising_csv(60).as_bytes()).unwrap();

        let engine = Engine::default();
        let assessment = evaluate_file(&engine, file.path(), None).unwrap();
        assert_eq!(assessment.direction, Direction::Bullish);
        assert_eq!(assessment.effectiveness, 60.0);

        let doc = FileAssessment {
            file: "rising.csv".into(),
            assessment: &assessment,
        };
        let json: serde_json::Value = serde_json::from_str(&to_json(&doc, false).unwrap()).unwrap();
        assert_eq!(json["file"], "rising.csv");
        assert_eq!(json["direction"], "alcista");
        assert_eq!(json["outcome"], "scored");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = evaluate_file(&Engine::default(), &dir.path().join("none.csv"), None).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn loads_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.toml");
        std::fs::write(
            &path,
            r#"
            [[levels]]
            label = "lenta"
            period = 30
            weight = 0.6

            [[levels]]
            label = "rapida"
            period = 10
            weight = 0.4

            [params.pullback]
            gate = 75.0
            "#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.levels.len(), 2);
        assert_eq!(config.levels.heaviest().label, "lenta");
        assert_eq!(config.params.pullback.gate, 75.0);
        assert_eq!(config.params.pullback.ma_period, 50);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "[[levels]]\nlabel = \"solo\"\nperiod = 20\nweight = 0.5\n",
        )
        .unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config"));
    }

    #[test]
    fn default_config_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.levels.len(), 3);
        assert_eq!(config.levels.version(), 1);
    }
}
