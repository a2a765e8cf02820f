//! Issue base library
//!
//! This module exposes the issue registry and its supporting pieces, shared
//! by the `issue` binary and the test suites.

pub mod error;
pub mod format;
pub mod generator;
pub mod hash;
pub mod logging;
pub mod prompt;
pub mod registry;
pub mod types;
