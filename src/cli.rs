//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::analysis::window::Preset;
use crate::models::ProgramCategory;

/// purpose-dash - census and discharge reporting for Purpose programs
///
/// Sign in with an emailed magic link, then pull census and discharge
/// reports from the reporting views. Markdown/JSON output, CSV export.
///
/// Examples:
///   purpose-dash login --email you@example.com
///   purpose-dash login --callback 'http://localhost:3000/#access_token=...'
///   purpose-dash census --preset month-to-date
///   purpose-dash daily --date 2024-03-01 --export kpi_data.csv
///   purpose-dash discharges --program Detox --program "SUD IOP" --format json
///   purpose-dash open /trends
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Backend project URL
    #[arg(long, global = true, value_name = "URL", env = "SUPABASE_URL")]
    pub backend_url: Option<String>,

    /// Backend public API key
    #[arg(long, global = true, value_name = "KEY", env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// URL the magic link redirects to after sign-in
    #[arg(long, global = true, value_name = "URL", env = "PURPOSE_REDIRECT_URL")]
    pub redirect_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .purpose-dash.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Session file holding the sign-in tokens
    #[arg(long, global = true, value_name = "FILE")]
    pub session_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format (markdown, json)
    #[arg(long, global = true, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Request a magic sign-in link, or finish signing in from one
    Login {
        /// Email address to send the sign-in link to
        #[arg(long, value_name = "EMAIL", required_unless_present = "callback")]
        email: Option<String>,

        /// The URL the sign-in link redirected to (contains the tokens)
        #[arg(long, value_name = "URL", conflicts_with = "email")]
        callback: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the current session
    Session,
    /// Census cards for a single day
    Daily {
        /// Census date (defaults to yesterday)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        /// Export the fetched rows to CSV (defaults to the configured export file)
        #[arg(long, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
    },
    /// Census trends over a date range
    Census {
        #[command(flatten)]
        range: RangeArgs,

        /// Export the fetched rows to CSV (defaults to the configured export file)
        #[arg(long, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
    },
    /// Discharge trends over a date range
    Discharges {
        #[command(flatten)]
        range: RangeArgs,

        /// Program to include (repeatable; defaults to all five programs)
        #[arg(long = "program", value_name = "PROGRAM")]
        programs: Vec<String>,

        /// Page of the discharge table to show
        #[arg(long, default_value = "1", value_name = "N")]
        page: usize,

        /// Rows per table page (defaults to the configured page size)
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,

        /// Export the fetched rows to CSV (defaults to the configured export file)
        #[arg(long, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
    },
    /// Open a view by path (/login, /dashboard, /census, /trends, ...)
    Open {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Generate a default .purpose-dash.toml configuration file
    InitConfig,
}

/// Date range selection shared by the trend views.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First day of the range (inclusive)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Last day of the range (inclusive)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,

    /// Named range; explicit --start/--end override its bounds
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<Preset>,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Command::Login {
                email: Some(email), ..
            } => {
                if !email.contains('@') {
                    return Err(format!("Not an email address: {}", email));
                }
            }
            Command::Census { range, .. } => validate_range(range)?,
            Command::Discharges {
                range,
                programs,
                page_size,
                ..
            } => {
                validate_range(range)?;
                for program in programs {
                    if !ProgramCategory::from(program.as_str()).is_known() {
                        return Err(format!(
                            "Unknown program '{}'. Expected one of: {}",
                            program,
                            known_program_names()
                        ));
                    }
                }
                if *page_size == Some(0) {
                    return Err("Page size must be at least 1".to_string());
                }
            }
            Command::Open { path } => {
                if !path.starts_with('/') {
                    return Err(format!("View paths start with '/': {}", path));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_range(range: &RangeArgs) -> Result<(), String> {
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(format!(
                "Start date {} is after end date {}",
                start, end
            ));
        }
    }
    Ok(())
}

fn known_program_names() -> String {
    ProgramCategory::KNOWN
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
