//! Infrastructure layer module
//!
//! This module contains the adapters and ambient plumbing:
//! - Command-backed collaborators and static tools
//! - Configuration management
//! - Project context detection
//! - Logging infrastructure
//! - Run report persistence
//!
//! Collaborator implementations satisfy the port traits defined in the domain layer.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod logging;
pub mod report;
