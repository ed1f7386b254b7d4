//! # smi-adapter-gpu
//!
//! Adapters for GPU system management interface (SMI) libraries.
//!
//! This crate provides:
//! - The [`SmiLibrary`] trait, a Rust rendition of the library's C ABI:
//!   every call returns a [`Status`](smi_core::Status) and writes through
//!   nullable output parameters
//! - A ROCm SMI backend that loads `librocm_smi64.so` at runtime
//! - A mock backend with injectable faults for testing
//! - Device discovery and a power telemetry reader built on the trait
//!
//! ## Supported Backends
//!
//! - **ROCm**: AMD ROCm SMI library (`rocm` feature)
//! - **Mock**: in-memory devices (`mock` feature, always available in tests)
//!
//! ## Example
//!
//! ```rust,no_run
//! use smi_adapter_gpu::{open_library, power::read_power};
//! use smi_core::BackendConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut library = open_library(&BackendConfig::mock())?;
//!     library.init(0).into_result().map_err(|s| s.to_string())?;
//!
//!     let telemetry = read_power(library.as_ref(), 0, 0);
//!     println!("GPU 0 power: {:?}", telemetry);
//!
//!     library.shut_down();
//!     Ok(())
//! }
//! ```

use smi_core::{BackendConfig, BackendKind, Status};
use thiserror::Error;
use tracing::info;

pub mod discovery;
pub mod library;
pub mod power;

// Backend-specific modules
#[cfg(feature = "rocm")]
pub mod rocm;

// Mock implementation for testing
#[cfg(any(feature = "mock", test))]
pub mod mock;

// Re-export main types
pub use discovery::{discover_devices, DeviceDescriptor};
pub use library::SmiLibrary;
pub use power::{read_power, PowerTelemetry, Reading};

#[cfg(any(feature = "mock", test))]
pub use mock::MockSmiLibrary;

#[cfg(feature = "rocm")]
pub use rocm::RocmSmiLibrary;

/// Result type for GPU operations
pub type Result<T> = std::result::Result<T, GpuError>;

/// Errors that can occur during GPU operations
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("GPU backend not supported: {0}")]
    UnsupportedBackend(String),

    #[error("SMI library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("SMI library is missing symbol {symbol}: {reason}")]
    SymbolMissing { symbol: &'static str, reason: String },

    #[error("{call} failed: {status}")]
    Status { call: &'static str, status: Status },

    #[error("GPU not found: {0}")]
    GpuNotFound(u32),

    #[error("Core error: {0}")]
    Core(#[from] smi_core::Error),
}

impl GpuError {
    /// Wrap a non-success status returned by `call`
    pub fn status(call: &'static str, status: Status) -> Self {
        GpuError::Status { call, status }
    }

    /// Check if this error indicates a driver or library issue
    pub fn is_driver_issue(&self) -> bool {
        matches!(
            self,
            GpuError::LibraryUnavailable(_)
                | GpuError::SymbolMissing { .. }
                | GpuError::Status {
                    status: Status::InitError
                        | Status::InternalException
                        | Status::AmdgpuRestartErr
                        | Status::FileError,
                    ..
                }
        )
    }

    /// Check if this error indicates a permission issue
    pub fn is_permission_issue(&self) -> bool {
        matches!(
            self,
            GpuError::Status {
                status: Status::Permission,
                ..
            }
        )
    }
}

/// Turn a status into a `Result`, naming the call on failure
pub fn check_status(call: &'static str, status: Status) -> Result<()> {
    status
        .into_result()
        .map_err(|status| GpuError::status(call, status))
}

/// Create the library selected by `config`
pub fn open_library(config: &BackendConfig) -> Result<Box<dyn SmiLibrary>> {
    info!("Opening SMI library for backend: {}", config.kind);

    match config.kind {
        #[cfg(feature = "rocm")]
        BackendKind::Rocm => Ok(Box::new(RocmSmiLibrary::load(config.library_path.as_deref())?)),

        #[cfg(not(feature = "rocm"))]
        BackendKind::Rocm => Err(GpuError::UnsupportedBackend(
            "rocm backend not compiled in (enable the `rocm` feature)".to_string(),
        )),

        #[cfg(any(feature = "mock", test))]
        BackendKind::Mock => Ok(Box::new(MockSmiLibrary::new(config.mock_devices.clone()))),

        #[cfg(not(any(feature = "mock", test)))]
        BackendKind::Mock => Err(GpuError::UnsupportedBackend(
            "mock backend not compiled in (enable the `mock` feature)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_error_properties() {
        let perm_error = GpuError::status("rsmi_dev_power_ave_get", Status::Permission);
        assert!(perm_error.is_permission_issue());
        assert!(!perm_error.is_driver_issue());

        let init_error = GpuError::status("rsmi_init", Status::InitError);
        assert!(init_error.is_driver_issue());
        assert!(!init_error.is_permission_issue());

        let missing = GpuError::LibraryUnavailable("librocm_smi64.so".to_string());
        assert!(missing.is_driver_issue());
    }

    #[test]
    fn test_error_display() {
        let error = GpuError::status("rsmi_dev_power_cap_get", Status::NotSupported);
        assert!(error
            .to_string()
            .starts_with("rsmi_dev_power_cap_get failed: RSMI_STATUS_NOT_SUPPORTED"));

        let error = GpuError::GpuNotFound(7);
        assert_eq!(error.to_string(), "GPU not found: 7");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("rsmi_init", Status::Success).is_ok());
        assert!(matches!(
            check_status("rsmi_init", Status::Busy),
            Err(GpuError::Status { call: "rsmi_init", status: Status::Busy })
        ));
    }

    #[test]
    fn test_open_mock_library() {
        let library = open_library(&BackendConfig::mock()).unwrap();
        assert_eq!(library.backend_name(), "mock");
    }
}
