//! Command-line interface for motion table extraction.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use crate::config::{GraphSpec, MotionConfig};
use crate::core::loaders::normalize_log_prefix;
use crate::core::writers::{render_table, write_table_csv};
use crate::processors::{extract_motion_table, list_available_datasets};

#[derive(Parser, Debug)]
#[command(name = "motan-log")]
#[command(about = "Extract a time-aligned motion data table from a recorded log", version)]
pub struct Cli {
    /// Log file prefix (a trailing .json or .index.json is ignored)
    #[arg(required_unless_present = "list_datasets")]
    logname: Option<String>,

    /// Filename of output CSV (prints the table when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Set the start time to graph, in seconds
    #[arg(short, long)]
    skip: Option<f64>,

    /// Number of seconds to graph
    #[arg(short, long)]
    duration: Option<f64>,

    /// Analysis segment time in seconds (default 0.0001)
    #[arg(long)]
    segment_time: Option<f64>,

    /// Graph to generate, as JSON rows of descriptors, e.g. '[["status(a.b)?color=red"]]'
    #[arg(short, long)]
    graph: Option<String>,

    /// List available datasets
    #[arg(short, long)]
    list_datasets: bool,

    /// Path to YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Dataset catalog as printed by `--list-datasets`.
pub fn format_dataset_listing(datasets: &[(&str, &str)]) -> String {
    let mut out = String::from("\nAvailable datasets:\n");
    for (dataset, desc) in datasets {
        let _ = writeln!(out, "{:<24}: {}", dataset, desc);
    }
    out.push('\n');
    out
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    if cli.list_datasets {
        print!("{}", format_dataset_listing(&list_available_datasets()));
        return;
    }

    let config = load_config(cli.config.as_deref());

    if let Err(e) = cmd_extract(&cli, &config) {
        error!("Motion table generation failed: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> MotionConfig {
    match path {
        Some(path) => match MotionConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                MotionConfig::default()
            }
        },
        None => MotionConfig::default(),
    }
}

fn cmd_extract(cli: &Cli, config: &MotionConfig) -> Result<()> {
    let start = Instant::now();

    let logname = cli.logname.as_deref().context("Incorrect number of arguments")?;
    let log_prefix = PathBuf::from(normalize_log_prefix(logname));

    // Command-line values override the config file
    let mut window_config = config.window.clone();
    if let Some(skip) = cli.skip {
        window_config.skip = skip;
    }
    if let Some(duration) = cli.duration {
        window_config.duration = duration;
    }
    if let Some(segment_time) = cli.segment_time {
        window_config.segment_time = segment_time;
    }
    let window = window_config.to_window().context("Invalid analysis window")?;

    let graph = match &cli.graph {
        Some(literal) => GraphSpec::parse(literal).context("Invalid --graph value")?,
        None => config.graph.clone(),
    };

    info!(
        "Extracting {} descriptor(s) from {} (skip {}s, duration {}s, segment {}s)",
        graph.num_descriptors(),
        log_prefix.display(),
        window.skip(),
        window.duration(),
        window.segment_time()
    );

    let spinner = create_spinner("Generating datasets...");
    let result = extract_motion_table(&log_prefix, &window, graph.rows());
    spinner.finish_and_clear();
    let table = result.with_context(|| format!("Failed to analyze log {}", log_prefix.display()))?;

    match &cli.output {
        None => {
            println!("{}", render_table(&table, config.output.print_max_rows));
        }
        Some(output) => {
            write_table_csv(output, &table)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} rows to {}", table.num_rows(), output.display());

            print_summary(
                "Motion Table Complete",
                &[
                    ("Log", log_prefix.display().to_string()),
                    ("Output CSV", output.display().to_string()),
                    ("Rows", table.num_rows().to_string()),
                    ("Columns", table.column_names().join(", ")),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_listing_format() {
        let listing = format_dataset_listing(&[("status(<field>)", "A status field"), ("d(x)", "Short")]);
        let lines: Vec<&str> = listing.split('\n').collect();

        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "Available datasets:");
        assert_eq!(lines[2], "status(<field>)         : A status field");
        assert_eq!(lines[3], "d(x)                    : Short");
        assert_eq!(lines[4], "");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["motan-log", "logs/run1"]).unwrap();
        assert_eq!(cli.logname.as_deref(), Some("logs/run1"));
        assert!(cli.output.is_none());
        assert!(cli.skip.is_none());
        assert!(!cli.list_datasets);
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "motan-log",
            "-o",
            "out.csv",
            "-s",
            "1.5",
            "-d",
            "2",
            "--segment-time",
            "0.001",
            "-g",
            r#"[["status(a.b)"]]"#,
            "run1",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(PathBuf::from("out.csv")));
        assert_eq!(cli.skip, Some(1.5));
        assert_eq!(cli.duration, Some(2.0));
        assert_eq!(cli.segment_time, Some(0.001));
        assert_eq!(cli.graph.as_deref(), Some(r#"[["status(a.b)"]]"#));
    }

    #[test]
    fn test_cli_requires_exactly_one_logname() {
        assert!(Cli::try_parse_from(["motan-log"]).is_err());
        assert!(Cli::try_parse_from(["motan-log", "a", "b"]).is_err());
        assert!(Cli::try_parse_from(["motan-log", "--list-datasets"]).is_ok());
        assert!(Cli::try_parse_from(["motan-log", "-l"]).is_ok());
    }

    #[test]
    fn test_cli_values_override_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("run.json");
        std::fs::write(
            &log,
            "{\"time\": 10.0, \"status\": {\"a\": {\"b\": 2.5}}}\n{\"time\": 12.0}\n",
        )
        .unwrap();
        let out = dir.path().join("out.csv");

        let cli = Cli::try_parse_from([
            "motan-log".to_string(),
            "-d".to_string(),
            "1".to_string(),
            "--segment-time".to_string(),
            "0.25".to_string(),
            "-g".to_string(),
            r#"["status(a.b)"]"#.to_string(),
            "-o".to_string(),
            out.display().to_string(),
            log.display().to_string(),
        ])
        .unwrap();

        cmd_extract(&cli, &MotionConfig::default()).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            content,
            "status(a.b),Time\n2.5,0.25\n2.5,0.5\n2.5,0.75\n2.5,1.0\n"
        );
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/motan.yaml")));
        assert_eq!(config, MotionConfig::default());
    }
}
