//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use quickcal_core::{Frequency, parse_duration, parse_when};

/// quickcal - Add events to Google Calendar from the terminal
#[derive(Debug, Parser)]
#[command(name = "quickcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "QUICKCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add an event to the calendar
    Add(AddArgs),

    /// Authorize quickcal to write to Google Calendar
    Auth {
        /// Path to Google Cloud Console credentials JSON file
        ///
        /// Recorded in config.toml so later commands find it.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Re-run the browser flow even if a credential is cached
        #[arg(long, short)]
        force: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Fields of the event to add.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Event title
    #[arg(long, short)]
    pub title: String,

    /// Start time, RFC 3339 or local "YYYY-MM-DD HH:MM"
    #[arg(long, short, value_parser = parse_when)]
    pub start: DateTime<Utc>,

    /// Duration in minutes, or with units like 15m, 2h, 1h30m
    #[arg(long, short, default_value = "60", value_parser = parse_duration)]
    pub duration: Duration,

    /// Repeat policy: none, daily, weekend or weekday
    #[arg(long, short, default_value = "none")]
    pub repeat: Frequency,

    /// Last occurrence, required when repeating
    #[arg(long, short, value_parser = parse_when)]
    pub until: Option<DateTime<Utc>>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
