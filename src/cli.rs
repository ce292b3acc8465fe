//! Command-line interface parsing for ronin-cache
//!
//! Each data subcommand runs one cache-aside lookup and prints the JSON
//! payload. The `cache` subcommands poke the cache facade directly.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::data::search::DEFAULT_MAX_RESULTS;
use crate::data::weather::DEFAULT_FORECAST_DAYS;

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    /// Latitude outside -90..=90 or not a number
    #[error("Invalid latitude: '{0}'. Expected a number between -90 and 90")]
    InvalidLatitude(String),

    /// Longitude outside -180..=180 or not a number
    #[error("Invalid longitude: '{0}'. Expected a number between -180 and 180")]
    InvalidLongitude(String),

    /// Value passed to `cache set` is not JSON
    #[error("Invalid JSON value: {0}")]
    InvalidJson(String),
}

/// ronin-cache - cached lookups against search, events, and weather APIs
#[derive(Parser, Debug)]
#[command(name = "ronin-cache")]
#[command(about = "Cached lookups against search, events, and weather APIs")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file, layered over ~/.config/ronin-cache/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Weather forecast for a coordinate
    Weather {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true, value_parser = parse_latitude)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true, value_parser = parse_longitude)]
        lon: f64,
        /// Days to forecast
        #[arg(long, default_value_t = DEFAULT_FORECAST_DAYS)]
        days: u32,
    },

    /// Scheduled events at a place
    Events {
        /// Place identifier
        #[arg(long)]
        location: String,
        /// Earliest start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Latest end date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Category filter, repeatable
        #[arg(long = "category", value_name = "CATEGORY")]
        categories: Vec<String>,
    },

    /// Web search
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: u32,
        /// Only search this domain, repeatable
        #[arg(long = "include-domain", value_name = "DOMAIN")]
        include_domains: Vec<String>,
        /// Never return this domain, repeatable
        #[arg(long = "exclude-domain", value_name = "DOMAIN")]
        exclude_domains: Vec<String>,
    },

    /// Direct cache access
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// `cache` subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum CacheCommand {
    /// Print the value stored under a key
    Get {
        /// Cache key
        key: String,
    },
    /// Store a JSON value under a key
    Set {
        /// Cache key
        key: String,
        /// JSON value, e.g. '{"a": 1}' or '[]'
        #[arg(value_parser = parse_json_value)]
        value: serde_json::Value,
        /// Time-to-live in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },
    /// Remove a key
    Delete {
        /// Cache key
        key: String,
    },
    /// Report which backend serves the cache
    Status,
}

/// Parses a latitude argument
///
/// # Returns
/// * `Ok(f64)` if the value is a finite number in -90..=90
/// * `Err(CliError::InvalidLatitude)` otherwise
pub fn parse_latitude(s: &str) -> Result<f64, CliError> {
    parse_degrees(s, 90.0).ok_or_else(|| CliError::InvalidLatitude(s.to_string()))
}

/// Parses a longitude argument
pub fn parse_longitude(s: &str) -> Result<f64, CliError> {
    parse_degrees(s, 180.0).ok_or_else(|| CliError::InvalidLongitude(s.to_string()))
}

fn parse_degrees(s: &str, limit: f64) -> Option<f64> {
    let value: f64 = s.trim().parse().ok()?;
    (value.is_finite() && value.abs() <= limit).then_some(value)
}

/// Parses the value given to `cache set`
pub fn parse_json_value(s: &str) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(s).map_err(|e| CliError::InvalidJson(e.to_string()))
}
