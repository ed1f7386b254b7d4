//! Shared per-case behavior
//!
//! A [`Session`] is what every test case leans on: it initializes and shuts
//! down the library, enumerates the monitored devices, prints the standard
//! banners and turns unexpected status codes into check failures.

use crate::case::CaseInfo;
use crate::console::Console;
use crate::{HarnessError, Result};
use smi_adapter_gpu::SmiLibrary;
use smi_core::{RunParams, Status, Verbosity};
use std::fmt;
use tracing::{debug, error, info, warn};

const NO_DEVICES_MESSAGE: &str =
    "No monitor devices found on this machine. No ROCm SMI tests can be run.";

/// A failed assertion on library behavior
#[derive(Debug, Clone, PartialEq)]
pub enum CheckFailure {
    /// A call returned a status other than the one required
    Status {
        call: &'static str,
        device: Option<u32>,
        expected: Status,
        actual: Status,
    },
    /// Values returned by the library violate an invariant
    Invariant { device: u32, message: String },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::Status {
                call,
                device,
                expected,
                actual,
            } => {
                write!(f, "{}", call)?;
                if let Some(device) = device {
                    write!(f, " on device {}", device)?;
                }
                write!(
                    f,
                    " returned {}, expected {}",
                    actual.symbol(),
                    expected.symbol()
                )
            }
            CheckFailure::Invariant { device, message } => {
                write!(f, "device {}: {}", device, message)
            }
        }
    }
}

impl std::error::Error for CheckFailure {}

/// Result of a query that may legitimately be refused for lack of privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

/// Library, transcript and parameters for one test case
pub struct Session<'a> {
    library: &'a mut dyn SmiLibrary,
    console: &'a mut Console,
    params: &'a RunParams,
    devices: Vec<u32>,
    setup_failure: Option<String>,
    initialized: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        library: &'a mut dyn SmiLibrary,
        console: &'a mut Console,
        params: &'a RunParams,
    ) -> Self {
        Self {
            library,
            console,
            params,
            devices: Vec::new(),
            setup_failure: None,
            initialized: false,
        }
    }

    pub fn library(&self) -> &dyn SmiLibrary {
        &*self.library
    }

    pub fn console(&mut self) -> &mut Console {
        &mut *self.console
    }

    pub fn params(&self) -> &RunParams {
        self.params
    }

    pub fn num_iterations(&self) -> u32 {
        self.params.iterations
    }

    /// Device indices monitored by this session, valid after set-up
    pub fn devices(&self) -> &[u32] {
        &self.devices
    }

    pub fn setup_failed(&self) -> bool {
        self.setup_failure.is_some()
    }

    pub fn setup_failure(&self) -> Option<&str> {
        self.setup_failure.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record that set-up failed; `run` will skip the case
    pub fn mark_setup_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Set-up failed: {}", reason);
        self.console.say(Verbosity::Min, format_args!("** {} **", reason));
        self.setup_failure.get_or_insert(reason);
    }

    /// Initialize the library and pick the devices to monitor
    ///
    /// Failures are recorded with [`mark_setup_failed`](Self::mark_setup_failed)
    /// rather than returned, so the case is skipped instead of aborted.
    pub fn set_up(&mut self) -> Result<()> {
        self.console.header(Verbosity::Progress, "SET-UP");

        let status = self.library.init(self.params.init_flags);
        if !status.is_success() {
            let description = self.library.status_string(status);
            self.mark_setup_failed(format!("rsmi_init failed: {}", description));
            return Ok(());
        }
        self.initialized = true;

        let mut count = 0u32;
        let status = self.library.num_monitor_devices(Some(&mut count));
        if !status.is_success() {
            let description = self.library.status_string(status);
            self.mark_setup_failed(format!("rsmi_num_monitor_devices failed: {}", description));
            return Ok(());
        }
        if count == 0 {
            self.mark_setup_failed(NO_DEVICES_MESSAGE);
            return Ok(());
        }

        self.devices = match &self.params.devices {
            Some(requested) => requested
                .iter()
                .copied()
                .filter(|index| {
                    let known = *index < count;
                    if !known {
                        warn!("Ignoring device {}: only {} devices are monitored", index, count);
                    }
                    known
                })
                .collect(),
            None => (0..count).collect(),
        };

        if self.devices.is_empty() {
            self.mark_setup_failed(format!(
                "None of the requested devices exist ({} monitored)",
                count
            ));
            return Ok(());
        }

        info!(
            backend = self.library.backend_name(),
            devices = ?self.devices,
            "Session set up"
        );
        Ok(())
    }

    pub fn display_test_info(&mut self, info: &CaseInfo) {
        self.console.header(Verbosity::Standard, "TEST INFO");
        self.console
            .say(Verbosity::Standard, format_args!("\tTitle: {}", info.title));
        self.console
            .say(Verbosity::Standard, format_args!("\tDescription: {}", info.description));
    }

    pub fn run_header(&mut self) {
        self.console.header(Verbosity::Progress, "RUN");
    }

    pub fn display_results_header(&mut self) {
        self.console.header(Verbosity::Progress, "RESULTS");
    }

    /// Shut the library down if this session initialized it
    pub fn close(&mut self) -> Result<()> {
        self.console.header(Verbosity::Progress, "CLOSE");
        if !self.initialized {
            debug!("Library was never initialized, nothing to close");
            return Ok(());
        }

        self.initialized = false;
        let status = self.library.shut_down();
        self.check("rsmi_shut_down", None, status)
    }

    /// Print index, id and name of `dv_ind`
    pub fn print_device_header(&mut self, dv_ind: u32) -> Result<()> {
        self.console
            .say(Verbosity::Standard, format_args!("\t**Device index: {}", dv_ind));

        let mut id = 0u16;
        let status = self.library.dev_id(dv_ind, Some(&mut id));
        self.check("rsmi_dev_id_get", Some(dv_ind), status)?;
        self.console
            .say(Verbosity::Standard, format_args!("\t**Device ID: 0x{:x}", id));

        let mut name = String::new();
        let status = self.library.dev_name(dv_ind, Some(&mut name));
        self.check("rsmi_dev_name_get", Some(dv_ind), status)?;
        self.console
            .say(Verbosity::Standard, format_args!("\t**Device name: {}", name));

        Ok(())
    }

    /// Require `status` to be success
    pub fn check(&mut self, call: &'static str, device: Option<u32>, status: Status) -> Result<()> {
        self.expect_status(call, device, status, Status::Success)
    }

    /// Require success, but tolerate a permission refusal
    pub fn check_permission(
        &mut self,
        call: &'static str,
        device: Option<u32>,
        status: Status,
    ) -> Result<Access> {
        if status == Status::Permission {
            warn!(call, ?device, "Permission denied; continuing");
            self.console
                .say(Verbosity::Standard, "\t**This command requires root access.");
            return Ok(Access::Denied);
        }

        self.check(call, device, status)?;
        Ok(Access::Granted)
    }

    /// Require exactly `expected`
    pub fn expect_status(
        &mut self,
        call: &'static str,
        device: Option<u32>,
        actual: Status,
        expected: Status,
    ) -> Result<()> {
        if actual == expected {
            return Ok(());
        }

        let description = self.library.status_string(actual);
        self.console
            .say(Verbosity::Min, format_args!("\t** {} returned: {}", call, description));

        let failure = CheckFailure::Status {
            call,
            device,
            expected,
            actual,
        };
        error!("{}", failure);
        Err(HarnessError::Check(failure))
    }

    /// Build the failure for a violated invariant on `device`
    pub fn fail_invariant(&mut self, device: u32, message: impl Into<String>) -> HarnessError {
        let failure = CheckFailure::Invariant {
            device,
            message: message.into(),
        };
        self.console.say(Verbosity::Min, format_args!("\t** {}", failure));
        error!("{}", failure);
        HarnessError::Check(failure)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // Best effort cleanup when close() was never reached
        if self.initialized {
            warn!("Session dropped without close; shutting the library down");
            let status = self.library.shut_down();
            if !status.is_success() {
                warn!("rsmi_shut_down during cleanup returned {}", status.symbol());
            }
        }
    }
}
