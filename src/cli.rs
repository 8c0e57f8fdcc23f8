use crate::config::{DEFAULT_FRIDA_SCRIPT, DEFAULT_SUBJECT, DEFAULT_TOP_N};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capwatch")]
#[command(about = "Detect program capabilities by matching rules against observed runtime features")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format (json, terminal)
    #[arg(short, long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a rules directory and list its rules and load failures
    Rules {
        /// Directory of *.yml / *.yaml rule files
        rules: PathBuf,
    },

    /// Evaluate rules once against a recorded observation log
    Match {
        /// Directory of *.yml / *.yaml rule files
        rules: PathBuf,

        /// Observation log, one event per line ("-" reads stdin)
        observations: String,

        /// Address reported for matches
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        address: String,

        /// Show the evaluated rule tree for each match
        #[arg(long)]
        explain: bool,
    },

    /// Monitor a running program and report capabilities as they appear
    Watch {
        /// Directory of *.yml / *.yaml rule files
        rules: PathBuf,

        /// Android package to spawn under Frida
        #[arg(long, conflicts_with = "command")]
        package: Option<String>,

        /// Frida script used with --package
        #[arg(long, default_value = DEFAULT_FRIDA_SCRIPT)]
        script: PathBuf,

        /// Re-evaluation interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Grace period before the observed process is killed, in milliseconds
        #[arg(long, default_value_t = 5000)]
        stop_timeout_ms: u64,

        /// Address reported for matches
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        address: String,

        /// Number of features listed in the closing statistics
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,

        /// Observer command emitting one event per line (after --)
        #[arg(last = true)]
        command: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output for machine consumption
    Json,
    /// Human-readable terminal output
    Terminal,
}
