//! Power telemetry data structures

use crate::library::SmiLibrary;
use serde::{Deserialize, Serialize};
use smi_core::{Microwatts, PowerCapRange, Status};

/// Outcome of a single library query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading<T> {
    /// The library returned a value
    Value(T),
    /// The library returned a non-success status
    Unavailable(Status),
}

impl<T> Reading<T> {
    fn from_status(status: Status, value: T) -> Self {
        if status.is_success() {
            Reading::Value(value)
        } else {
            Reading::Unavailable(status)
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Value(value) => Some(value),
            Reading::Unavailable(_) => None,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Reading::Value(_) => Status::Success,
            Reading::Unavailable(status) => *status,
        }
    }
}

/// Power information for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerTelemetry {
    /// Device index
    pub device: u32,

    /// Current power cap
    pub current_cap: Reading<Microwatts>,

    /// Default power cap
    pub default_cap: Reading<Microwatts>,

    /// Settable cap range
    pub cap_range: Reading<PowerCapRange>,

    /// Average power draw
    pub average: Reading<Microwatts>,
}

impl PowerTelemetry {
    /// Average power as a share of the current cap (0-100)
    pub fn cap_utilization(&self) -> Option<f64> {
        let average = self.average.value()?;
        let cap = self.current_cap.value()?;
        if cap.get() == 0 {
            return None;
        }
        Some(average.get() as f64 / cap.get() as f64 * 100.0)
    }
}

/// Read every power value of `device`
///
/// A failing query is recorded in its field rather than aborting the read.
pub fn read_power(library: &dyn SmiLibrary, device: u32, sensor: u32) -> PowerTelemetry {
    let mut cap = 0u64;
    let status = library.dev_power_cap(device, sensor, Some(&mut cap));
    let current_cap = Reading::from_status(status, Microwatts(cap));

    let mut default_cap = 0u64;
    let status = library.dev_power_cap_default(device, Some(&mut default_cap));
    let default_cap = Reading::from_status(status, Microwatts(default_cap));

    let (mut max, mut min) = (0u64, 0u64);
    let status = library.dev_power_cap_range(device, sensor, Some(&mut max), Some(&mut min));
    let cap_range = Reading::from_status(status, PowerCapRange::new(min, max));

    let mut average = 0u64;
    let status = library.dev_power_ave(device, sensor, Some(&mut average));
    let average = Reading::from_status(status, Microwatts(average));

    PowerTelemetry {
        device,
        current_cap,
        default_cap,
        cap_range,
        average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSmiLibrary;
    use smi_core::MockDeviceSpec;

    #[test]
    fn test_read_power() {
        let mut library = MockSmiLibrary::new(vec![MockDeviceSpec::sample(0)]);
        library.init(0);

        let telemetry = read_power(&library, 0, 0);
        assert_eq!(telemetry.current_cap, Reading::Value(Microwatts(300_000_000)));
        assert_eq!(telemetry.default_cap, Reading::Value(Microwatts(300_000_000)));
        assert_eq!(
            telemetry.cap_range,
            Reading::Value(PowerCapRange::new(0, 300_000_000))
        );
        assert_eq!(telemetry.average, Reading::Value(Microwatts(150_000_000)));
        assert_eq!(telemetry.cap_utilization(), Some(50.0));
    }

    #[test]
    fn test_read_power_records_failures() {
        let spec = MockDeviceSpec::sample(0)
            .with_fault("power_cap_range", Status::NotSupported)
            .with_restricted_average_power();
        let mut library = MockSmiLibrary::new(vec![spec]);
        library.init(0);

        let telemetry = read_power(&library, 0, 0);
        assert!(telemetry.current_cap.value().is_some());
        assert_eq!(telemetry.cap_range.status(), Status::NotSupported);
        assert_eq!(telemetry.average, Reading::Unavailable(Status::Permission));
        assert_eq!(telemetry.cap_utilization(), None);
    }

    #[test]
    fn test_reading_serialization() {
        let reading: Reading<Microwatts> = Reading::Unavailable(Status::Permission);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json, serde_json::json!({ "unavailable": "permission" }));

        let reading = Reading::Value(Microwatts(5));
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json, serde_json::json!({ "value": 5 }));
    }
}
