//! Core configuration, errors, and utilities for autodock.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Config`] and its sections ([`AgentConfig`], [`WatchConfig`], [`RedeployConfig`])
//! - [`ConfigError`] for configuration loading and validation failures
//! - Go-style duration strings (`"60s"`, `"2m"`, `"1h30m"`) via
//!   [`parse_duration`] and [`format_duration`]

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod duration;
pub mod error;

pub use config::{AgentConfig, Config, LauncherKind, RedeployConfig, WatchConfig};
pub use duration::{format_duration, parse_duration, parse_positive_duration, DurationError};
pub use error::ConfigError;
