//! quickcal command-line interface.
//!
//! This crate provides the `quickcal` binary: argument parsing,
//! `config.toml` handling and the `add` / `auth` / `config` commands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{CliError, CliResult};
