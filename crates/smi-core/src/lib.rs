//! # smi-core
//!
//! Core types and utilities shared by the rsmitst crates.
//!
//! This crate provides the vocabulary every other crate speaks:
//!
//! - The status enumeration returned by every SMI library call
//! - Power units and the power cap range
//! - Transcript verbosity levels
//! - Suite configuration (run parameters, backend selection, logging)
//! - Error handling types

pub mod config;
pub mod error;
pub mod status;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{
    BackendConfig, BackendKind, LoggingConfig, MockDeviceSpec, RunParams, SuiteConfig,
    MOCK_FAULT_CALLS,
};
pub use error::{Error, Result};
pub use status::Status;
pub use types::{Microwatts, PowerCapRange, Verbosity};
