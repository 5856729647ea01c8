//! Subcommand implementations.

pub mod add;
pub mod auth;
pub mod config;
