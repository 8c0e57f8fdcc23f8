use anyhow::{Context, Result};
use capwatch::cli::{self, Command, OutputFormat};
use capwatch::config::WatchConfig;
use capwatch::engine::match_rules;
use capwatch::extractor::{frida_command, FeatureExtractor, Monitor};
use capwatch::features::Address;
use capwatch::output;
use capwatch::rules::RuleSet;
use capwatch::watch::{self, Watcher};
use clap::Parser;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse args early to get verbose flag for logging initialization
    let args = cli::Args::parse();

    // Use RUST_LOG env var if set, otherwise use verbose flag
    // Examples: RUST_LOG=debug, RUST_LOG=capwatch::engine=trace
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("capwatch=debug")
    } else {
        EnvFilter::new("capwatch=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("Logging initialized (verbose={})", args.verbose);

    match args.command {
        Command::Rules { rules } => list_rules(&rules, args.format),
        Command::Match {
            rules,
            observations,
            address,
            explain,
        } => match_once(&rules, &observations, &address, explain, args.format),
        Command::Watch {
            rules,
            package,
            script,
            interval_ms,
            stop_timeout_ms,
            address,
            top,
            command,
        } => {
            let config = WatchConfig::new(
                Duration::from_millis(interval_ms),
                Duration::from_millis(stop_timeout_ms),
                address,
                top,
            )?;
            let (program, program_args) = match package {
                Some(package) => frida_command(&package, &script)?,
                None => {
                    let mut parts = command.into_iter();
                    let program = parts.next().context(
                        "nothing to monitor: pass --package or an observer command after --",
                    )?;
                    (program, parts.collect())
                }
            };
            watch_program(&rules, &program, &program_args, &config, args.format)
        }
    }
}

fn load_rules(dir: &Path) -> Result<RuleSet> {
    RuleSet::from_directory(dir)
        .with_context(|| format!("Failed to load rules from {}", dir.display()))
}

fn list_rules(dir: &Path, format: OutputFormat) -> Result<()> {
    let rules = load_rules(dir)?;
    let rendered = match format {
        OutputFormat::Json => output::format_rules_json(&rules)?,
        OutputFormat::Terminal => output::format_rules_terminal(&rules),
    };
    println!("{}", rendered);
    Ok(())
}

fn match_once(
    dir: &Path,
    observations: &str,
    address: &str,
    explain: bool,
    format: OutputFormat,
) -> Result<()> {
    let rules = load_rules(dir)?;

    let mut extractor = FeatureExtractor::new();
    if observations == "-" {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            extractor.ingest_line(&line.context("Failed to read observations from stdin")?);
        }
    } else {
        let path = Path::new(observations);
        if !path.exists() {
            anyhow::bail!("Observation file does not exist: {}", path.display());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for line in content.lines() {
            extractor.ingest_line(line);
        }
    }

    let features = extractor.features();
    debug!(
        "Evaluating {} rules against {} features",
        rules.len(),
        features.len()
    );
    let report = match_rules(rules.rules(), features, &Address::new(address));

    let rendered = match format {
        OutputFormat::Json => output::format_report_json(&report, &rules)?,
        OutputFormat::Terminal => output::format_report_terminal(&report, &rules, explain),
    };
    println!("{}", rendered);
    Ok(())
}

fn watch_program(
    dir: &Path,
    program: &str,
    program_args: &[String],
    config: &WatchConfig,
    format: OutputFormat,
) -> Result<()> {
    // Ctrl-C ends the session; the observer is stopped and statistics printed
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    let rules = load_rules(dir)?;
    tracing::info!("Loaded {} rules", rules.len());

    let monitor = Monitor::spawn(program, program_args)?;
    let mut extractor = FeatureExtractor::new();
    let mut watcher = Watcher::new(rules, config.subject.clone());

    let stdout = std::io::stdout();
    let detections = watch::run(
        &mut watcher,
        &mut extractor,
        monitor.lines(),
        &stop_rx,
        config,
        |detection| {
            let rendered = match format {
                OutputFormat::Json => output::format_detection_json(detection)
                    .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e)),
                OutputFormat::Terminal => output::format_detection_terminal(detection),
            };
            let mut out = stdout.lock();
            let _ = writeln!(out, "{}", rendered);
            let _ = out.flush();
        },
    );

    monitor.stop(config.stop_timeout)?;

    let stats = extractor.statistics(config.top_n);
    let rendered = match format {
        OutputFormat::Json => output::format_statistics_json(&stats)?,
        OutputFormat::Terminal => output::format_statistics_terminal(&stats),
    };
    println!("{}", rendered);
    tracing::info!("Analysis complete: {} capabilities detected", detections);
    Ok(())
}
