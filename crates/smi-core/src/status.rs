//! SMI library status codes
//!
//! Every library entry point returns one of these codes and writes its result
//! through output parameters. The numeric values are part of the C ABI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status returned by an SMI library call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    InvalidArgs,
    NotSupported,
    FileError,
    Permission,
    OutOfResources,
    InternalException,
    InputOutOfBounds,
    InitError,
    NotYetImplemented,
    NotFound,
    InsufficientSize,
    Interrupt,
    UnexpectedSize,
    NoData,
    UnexpectedData,
    Busy,
    RefcountOverflow,
    SettingUnavailable,
    AmdgpuRestartErr,
    UnknownError,
    /// A code this build does not know about
    Unrecognized(u32),
}

const UNKNOWN_ERROR_CODE: u32 = 0xFFFF_FFFF;

impl Status {
    /// Map a raw status code to a `Status`
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Status::Success,
            1 => Status::InvalidArgs,
            2 => Status::NotSupported,
            3 => Status::FileError,
            4 => Status::Permission,
            5 => Status::OutOfResources,
            6 => Status::InternalException,
            7 => Status::InputOutOfBounds,
            8 => Status::InitError,
            9 => Status::NotYetImplemented,
            10 => Status::NotFound,
            11 => Status::InsufficientSize,
            12 => Status::Interrupt,
            13 => Status::UnexpectedSize,
            14 => Status::NoData,
            15 => Status::UnexpectedData,
            16 => Status::Busy,
            17 => Status::RefcountOverflow,
            18 => Status::SettingUnavailable,
            19 => Status::AmdgpuRestartErr,
            UNKNOWN_ERROR_CODE => Status::UnknownError,
            other => Status::Unrecognized(other),
        }
    }

    /// Raw status code
    pub fn code(&self) -> u32 {
        match self {
            Status::Success => 0,
            Status::InvalidArgs => 1,
            Status::NotSupported => 2,
            Status::FileError => 3,
            Status::Permission => 4,
            Status::OutOfResources => 5,
            Status::InternalException => 6,
            Status::InputOutOfBounds => 7,
            Status::InitError => 8,
            Status::NotYetImplemented => 9,
            Status::NotFound => 10,
            Status::InsufficientSize => 11,
            Status::Interrupt => 12,
            Status::UnexpectedSize => 13,
            Status::NoData => 14,
            Status::UnexpectedData => 15,
            Status::Busy => 16,
            Status::RefcountOverflow => 17,
            Status::SettingUnavailable => 18,
            Status::AmdgpuRestartErr => 19,
            Status::UnknownError => UNKNOWN_ERROR_CODE,
            Status::Unrecognized(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }

    /// Symbolic name as spelled in the C header
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Success => "RSMI_STATUS_SUCCESS",
            Status::InvalidArgs => "RSMI_STATUS_INVALID_ARGS",
            Status::NotSupported => "RSMI_STATUS_NOT_SUPPORTED",
            Status::FileError => "RSMI_STATUS_FILE_ERROR",
            Status::Permission => "RSMI_STATUS_PERMISSION",
            Status::OutOfResources => "RSMI_STATUS_OUT_OF_RESOURCES",
            Status::InternalException => "RSMI_STATUS_INTERNAL_EXCEPTION",
            Status::InputOutOfBounds => "RSMI_STATUS_INPUT_OUT_OF_BOUNDS",
            Status::InitError => "RSMI_STATUS_INIT_ERROR",
            Status::NotYetImplemented => "RSMI_STATUS_NOT_YET_IMPLEMENTED",
            Status::NotFound => "RSMI_STATUS_NOT_FOUND",
            Status::InsufficientSize => "RSMI_STATUS_INSUFFICIENT_SIZE",
            Status::Interrupt => "RSMI_STATUS_INTERRUPT",
            Status::UnexpectedSize => "RSMI_STATUS_UNEXPECTED_SIZE",
            Status::NoData => "RSMI_STATUS_NO_DATA",
            Status::UnexpectedData => "RSMI_STATUS_UNEXPECTED_DATA",
            Status::Busy => "RSMI_STATUS_BUSY",
            Status::RefcountOverflow => "RSMI_STATUS_REFCOUNT_OVERFLOW",
            Status::SettingUnavailable => "RSMI_STATUS_SETTING_UNAVAILABLE",
            Status::AmdgpuRestartErr => "RSMI_STATUS_AMDGPU_RESTART_ERR",
            Status::UnknownError => "RSMI_STATUS_UNKNOWN_ERROR",
            Status::Unrecognized(_) => "RSMI_STATUS_UNRECOGNIZED",
        }
    }

    /// Human-readable description of the status
    pub fn description(&self) -> &'static str {
        match self {
            Status::Success => "The function has been executed successfully.",
            Status::InvalidArgs => {
                "The provided arguments do not meet the preconditions required for the input."
            }
            Status::NotSupported => {
                "The requested information or action is not available for the given input, on the given system"
            }
            Status::FileError => {
                "Problem accessing a file. This may because the operation is not supported by the Linux kernel version running on the executing machine"
            }
            Status::Permission => {
                "An operation was attempted for which the user does not have permission."
            }
            Status::OutOfResources => "Unable to acquire memory or other resource",
            Status::InternalException => "An internal exception was caught",
            Status::InputOutOfBounds => "The provided input is out of allowable or safe range",
            Status::InitError => {
                "An error occurred during initialization, during monitor discovery or when initializing internal data structures"
            }
            Status::NotYetImplemented => {
                "The called function has not been implemented in this system for this device type"
            }
            Status::NotFound => "An item required to complete the call was not found",
            Status::InsufficientSize => {
                "Not enough resources were available to fully execute the call"
            }
            Status::Interrupt => "An interrupt occurred while executing the function",
            Status::UnexpectedSize => {
                "Data (usually from reading a file) was out of range from what was expected"
            }
            Status::NoData => "No data was found for a given input",
            Status::UnexpectedData => "The data read or provided was not what was expected",
            Status::Busy => {
                "A resource or mutex could not be acquired because it is already being used"
            }
            Status::RefcountOverflow => "An internal reference counter exceeded INT32_MAX",
            Status::SettingUnavailable => "Requested setting is unavailable for the current device",
            Status::AmdgpuRestartErr => "Could not successfully restart the amdgpu driver",
            Status::UnknownError => "An unknown error occurred",
            Status::Unrecognized(_) => "The library returned a status code this build does not know",
        }
    }

    /// `Ok(())` on success, the status itself otherwise
    pub fn into_result(self) -> std::result::Result<(), Status> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unrecognized(code) => {
                write!(f, "{} ({}): {}", self.symbol(), code, self.description())
            }
            _ => write!(f, "{}: {}", self.symbol(), self.description()),
        }
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Status::from_code(code)
    }
}
