//! # smi-harness
//!
//! Conformance test harness for SMI libraries.
//!
//! This crate provides:
//! - A [`TestCase`] trait each scenario implements (set up, run, report, close)
//! - A [`CaseHarness`] state machine that enforces the lifecycle order
//! - A [`Session`] carrying the shared behavior every case relies on:
//!   library init/shutdown, device enumeration, status checks
//! - The power read scenario and a suite runner producing serializable reports

pub mod case;
pub mod console;
pub mod lifecycle;
pub mod power_read;
pub mod report;
pub mod runner;
pub mod session;

// Re-export commonly used types
pub use case::{CaseInfo, TestCase};
pub use console::Console;
pub use lifecycle::{CaseHarness, LifecycleState};
pub use power_read::{AveragePower, PowerRead, PowerSample};
pub use report::{CaseReport, Outcome, SuiteReport};
pub use runner::{builtin_cases, SuiteRunner};
pub use session::{Access, CheckFailure, Session};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Error handling
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Check failed: {0}")]
    Check(#[from] CheckFailure),

    #[error("Cannot {action} case '{case}' while it is {state}")]
    InvalidTransition {
        case: String,
        action: &'static str,
        state: LifecycleState,
    },

    #[error("GPU error: {0}")]
    Gpu(#[from] smi_adapter_gpu::GpuError),

    #[error("Core error: {0}")]
    Core(#[from] smi_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HarnessError {
    /// Check if this error is a failed assertion on library behavior
    pub fn is_check_failure(&self) -> bool {
        matches!(self, HarnessError::Check(_))
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Setup test logging with appropriate levels
pub fn setup_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smi_harness=debug,smi_adapter_gpu=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
