//! The SMI library interface
//!
//! Mirrors the C entry points one-to-one. Output parameters are
//! `Option<&mut T>`: `None` is passed to the library as a null pointer, which
//! the library answers with `InvalidArgs` when the call is supported on the
//! device and `NotSupported` otherwise.

use smi_core::Status;

/// Trait defining the status-code API of an SMI library
pub trait SmiLibrary: Send {
    /// Short backend name for logs and reports
    fn backend_name(&self) -> &'static str;

    /// Initialize the library; reference counted
    fn init(&mut self, init_flags: u64) -> Status;

    /// Release one reference taken by `init`
    fn shut_down(&mut self) -> Status;

    /// Number of devices the library monitors
    fn num_monitor_devices(&self, num_devices: Option<&mut u32>) -> Status;

    /// PCI device id of device `dv_ind`
    fn dev_id(&self, dv_ind: u32, id: Option<&mut u16>) -> Status;

    /// Marketing name of device `dv_ind`
    fn dev_name(&self, dv_ind: u32, name: Option<&mut String>) -> Status;

    /// Current power cap in microwatts
    fn dev_power_cap(&self, dv_ind: u32, sensor_ind: u32, cap: Option<&mut u64>) -> Status;

    /// Default power cap in microwatts
    fn dev_power_cap_default(&self, dv_ind: u32, default_cap: Option<&mut u64>) -> Status;

    /// Settable power cap range in microwatts; note the C argument order,
    /// maximum first
    fn dev_power_cap_range(
        &self,
        dv_ind: u32,
        sensor_ind: u32,
        max: Option<&mut u64>,
        min: Option<&mut u64>,
    ) -> Status;

    /// Average power draw in microwatts
    fn dev_power_ave(&self, dv_ind: u32, sensor_ind: u32, power: Option<&mut u64>) -> Status;

    /// Library-provided description of `status`
    fn status_string(&self, status: Status) -> String {
        status.to_string()
    }
}
