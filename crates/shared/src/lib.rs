//! Shared configuration and email dispatch for Plately.
//!
//! This crate provides common pieces used across all other crates:
//! - Configuration management
//! - SMTP email dispatch for count reports

pub mod config;
pub mod email;

pub use config::AppConfig;
pub use email::{EmailError, EmailService};
