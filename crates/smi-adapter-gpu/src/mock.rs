//! Mock SMI library for testing

use crate::library::SmiLibrary;
use smi_core::{MockDeviceSpec, Status};
use tracing::{debug, info};

/// In-memory SMI library
///
/// Follows the real library's conventions: calls made before `init` fail
/// with `InitError`, unknown device indices and null outputs fail with
/// `InvalidArgs`, and a null output on a call the device does not support
/// reports `NotSupported`.
pub struct MockSmiLibrary {
    devices: Vec<MockDeviceSpec>,
    refcount: u32,
    init_status: Status,
    init_calls: u32,
    shutdown_calls: u32,
}

impl MockSmiLibrary {
    /// Create a new mock library exposing `devices`
    pub fn new(devices: Vec<MockDeviceSpec>) -> Self {
        info!("Creating mock SMI library with {} devices", devices.len());
        Self {
            devices,
            refcount: 0,
            init_status: Status::Success,
            init_calls: 0,
            shutdown_calls: 0,
        }
    }

    /// Make every `init` call fail with `status`
    pub fn with_init_status(mut self, status: Status) -> Self {
        self.init_status = status;
        self
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls
    }

    pub fn shutdown_calls(&self) -> u32 {
        self.shutdown_calls
    }

    pub fn is_initialized(&self) -> bool {
        self.refcount > 0
    }

    fn device(&self, dv_ind: u32) -> Result<&MockDeviceSpec, Status> {
        if self.refcount == 0 {
            return Err(Status::InitError);
        }
        self.devices.get(dv_ind as usize).ok_or(Status::InvalidArgs)
    }

    /// Shared argument handling for single-output queries
    fn query<T>(
        &self,
        call: &str,
        dv_ind: u32,
        out: Option<&mut T>,
        value: impl FnOnce(&MockDeviceSpec) -> T,
    ) -> Status {
        let device = match self.device(dv_ind) {
            Ok(device) => device,
            Err(status) => return status,
        };
        let fault = device.fault(call);

        let Some(out) = out else {
            return null_output_status(fault);
        };
        if let Some(status) = fault {
            debug!("Mock device {} forcing {} on {}", dv_ind, status.symbol(), call);
            return status;
        }

        *out = value(device);
        Status::Success
    }
}

/// Answer to a null output: the call is supported unless faulted as such
fn null_output_status(fault: Option<Status>) -> Status {
    match fault {
        Some(Status::NotSupported) => Status::NotSupported,
        _ => Status::InvalidArgs,
    }
}

impl SmiLibrary for MockSmiLibrary {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn init(&mut self, init_flags: u64) -> Status {
        self.init_calls += 1;
        if !self.init_status.is_success() {
            return self.init_status;
        }
        self.refcount += 1;
        debug!("Mock library init (flags {:#x}), refcount {}", init_flags, self.refcount);
        Status::Success
    }

    fn shut_down(&mut self) -> Status {
        self.shutdown_calls += 1;
        if self.refcount == 0 {
            return Status::InitError;
        }
        self.refcount -= 1;
        debug!("Mock library shut down, refcount {}", self.refcount);
        Status::Success
    }

    fn num_monitor_devices(&self, num_devices: Option<&mut u32>) -> Status {
        if self.refcount == 0 {
            return Status::InitError;
        }
        match num_devices {
            Some(out) => {
                *out = self.devices.len() as u32;
                Status::Success
            }
            None => Status::InvalidArgs,
        }
    }

    fn dev_id(&self, dv_ind: u32, id: Option<&mut u16>) -> Status {
        self.query("dev_id", dv_ind, id, |device| device.id)
    }

    fn dev_name(&self, dv_ind: u32, name: Option<&mut String>) -> Status {
        self.query("dev_name", dv_ind, name, |device| device.name.clone())
    }

    fn dev_power_cap(&self, dv_ind: u32, _sensor_ind: u32, cap: Option<&mut u64>) -> Status {
        self.query("power_cap", dv_ind, cap, |device| device.power_cap_uw)
    }

    fn dev_power_cap_default(&self, dv_ind: u32, default_cap: Option<&mut u64>) -> Status {
        self.query("power_cap_default", dv_ind, default_cap, |device| {
            device.default_power_cap_uw
        })
    }

    fn dev_power_cap_range(
        &self,
        dv_ind: u32,
        _sensor_ind: u32,
        max: Option<&mut u64>,
        min: Option<&mut u64>,
    ) -> Status {
        let device = match self.device(dv_ind) {
            Ok(device) => device,
            Err(status) => return status,
        };
        let fault = device.fault("power_cap_range");

        let (Some(max), Some(min)) = (max, min) else {
            return null_output_status(fault);
        };
        if let Some(status) = fault {
            return status;
        }

        *max = device.cap_max_uw;
        *min = device.cap_min_uw;
        Status::Success
    }

    fn dev_power_ave(&self, dv_ind: u32, _sensor_ind: u32, power: Option<&mut u64>) -> Status {
        let device = match self.device(dv_ind) {
            Ok(device) => device,
            Err(status) => return status,
        };
        let fault = device.fault("power_ave");

        let Some(power) = power else {
            return null_output_status(fault);
        };
        if let Some(status) = fault {
            return status;
        }
        if device.average_power_restricted {
            return Status::Permission;
        }

        *power = device.average_power_uw;
        Status::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized(devices: Vec<MockDeviceSpec>) -> MockSmiLibrary {
        let mut library = MockSmiLibrary::new(devices);
        assert_eq!(library.init(0), Status::Success);
        library
    }

    #[test]
    fn test_queries_require_init() {
        let library = MockSmiLibrary::new(vec![MockDeviceSpec::sample(0)]);
        let mut count = 0;
        let mut cap = 0;
        assert_eq!(library.num_monitor_devices(Some(&mut count)), Status::InitError);
        assert_eq!(library.dev_power_cap(0, 0, Some(&mut cap)), Status::InitError);
    }

    #[test]
    fn test_init_is_reference_counted() {
        let mut library = MockSmiLibrary::new(vec![]);
        assert_eq!(library.init(0), Status::Success);
        assert_eq!(library.init(0), Status::Success);
        assert_eq!(library.shut_down(), Status::Success);
        assert!(library.is_initialized());
        assert_eq!(library.shut_down(), Status::Success);
        assert!(!library.is_initialized());
        assert_eq!(library.shut_down(), Status::InitError);
        assert_eq!(library.init_calls(), 2);
        assert_eq!(library.shutdown_calls(), 3);
    }

    #[test]
    fn test_init_failure() {
        let mut library = MockSmiLibrary::new(vec![]).with_init_status(Status::InitError);
        assert_eq!(library.init(0), Status::InitError);
        assert!(!library.is_initialized());
    }

    #[test]
    fn test_power_queries() {
        let library = initialized(vec![MockDeviceSpec::sample(0), MockDeviceSpec::sample(1)]);

        let mut count = 0;
        assert_eq!(library.num_monitor_devices(Some(&mut count)), Status::Success);
        assert_eq!(count, 2);

        let mut cap = 0;
        assert_eq!(library.dev_power_cap(1, 0, Some(&mut cap)), Status::Success);
        assert_eq!(cap, 275_000_000);

        let mut default_cap = 0;
        assert_eq!(library.dev_power_cap_default(1, Some(&mut default_cap)), Status::Success);
        assert_eq!(default_cap, 300_000_000);

        let (mut max, mut min) = (0, 1);
        assert_eq!(
            library.dev_power_cap_range(0, 0, Some(&mut max), Some(&mut min)),
            Status::Success
        );
        assert_eq!((min, max), (0, 300_000_000));

        let mut power = 0;
        assert_eq!(library.dev_power_ave(0, 0, Some(&mut power)), Status::Success);
        assert_eq!(power, 150_000_000);
    }

    #[test]
    fn test_null_output_is_invalid_args() {
        let library = initialized(vec![MockDeviceSpec::sample(0)]);
        assert_eq!(library.dev_power_ave(0, 0, None), Status::InvalidArgs);
        assert_eq!(library.dev_power_cap(0, 0, None), Status::InvalidArgs);
        assert_eq!(library.num_monitor_devices(None), Status::InvalidArgs);

        let mut max = 0;
        assert_eq!(
            library.dev_power_cap_range(0, 0, Some(&mut max), None),
            Status::InvalidArgs
        );
    }

    #[test]
    fn test_null_output_on_unsupported_call() {
        let spec = MockDeviceSpec::sample(0).with_fault("power_ave", Status::NotSupported);
        let library = initialized(vec![spec]);
        assert_eq!(library.dev_power_ave(0, 0, None), Status::NotSupported);
    }

    #[test]
    fn test_restricted_average_power() {
        let spec = MockDeviceSpec::sample(0).with_restricted_average_power();
        let library = initialized(vec![spec]);

        let mut power = 7;
        assert_eq!(library.dev_power_ave(0, 0, Some(&mut power)), Status::Permission);
        assert_eq!(power, 7);
        // null-output check still answers before the permission check
        assert_eq!(library.dev_power_ave(0, 0, None), Status::InvalidArgs);
    }

    #[test]
    fn test_unknown_device() {
        let library = initialized(vec![MockDeviceSpec::sample(0)]);
        let mut cap = 0;
        assert_eq!(library.dev_power_cap(5, 0, Some(&mut cap)), Status::InvalidArgs);
    }

    #[test]
    fn test_injected_fault() {
        let spec = MockDeviceSpec::sample(0).with_fault("power_cap_default", Status::Busy);
        let library = initialized(vec![spec]);
        let mut cap = 0;
        assert_eq!(library.dev_power_cap_default(0, Some(&mut cap)), Status::Busy);
    }

    #[test]
    fn test_device_identity() {
        let library = initialized(vec![MockDeviceSpec::sample(0)]);
        let mut id = 0;
        let mut name = String::new();
        assert_eq!(library.dev_id(0, Some(&mut id)), Status::Success);
        assert_eq!(library.dev_name(0, Some(&mut name)), Status::Success);
        assert_eq!(id, 0x740f);
        assert_eq!(name, "Mock Instinct 0");
    }
}
