//! Utility functions and helpers for the gem2claude core.
//!
//! This module provides cross-cutting concerns: structured logging, signature redaction
//! and identifier generation.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization with security filters.
//! - `ids`: Namespaced random identifiers for messages and tool calls.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod ids;
pub mod logging;
