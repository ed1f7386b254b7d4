//! `devices` and `power`: query the library outside of a test case

use super::InitializedLibrary;
use crate::output::OutputFormatter;
use anyhow::Result;
use smi_adapter_gpu::{discover_devices, read_power, GpuError, PowerTelemetry};
use smi_core::SuiteConfig;
use tracing::info;

pub fn list_devices(config: &SuiteConfig, formatter: &OutputFormatter) -> Result<()> {
    let library = InitializedLibrary::open(config)?;
    let devices = discover_devices(&*library)?;
    info!("Found {} devices", devices.len());
    formatter.print_list(&devices)
}

/// Power readings for every monitored device, or the configured subset
///
/// Fails with [`GpuError::GpuNotFound`] when a requested index is not
/// monitored.
pub fn collect_power(config: &SuiteConfig) -> Result<Vec<PowerTelemetry>> {
    let library = InitializedLibrary::open(config)?;
    let devices = discover_devices(&*library)?;

    let indices: Vec<u32> = match &config.run.devices {
        Some(selected) => {
            if let Some(missing) = selected
                .iter()
                .find(|index| !devices.iter().any(|device| device.index == **index))
            {
                return Err(GpuError::GpuNotFound(*missing).into());
            }
            selected.clone()
        }
        None => devices.iter().map(|device| device.index).collect(),
    };

    let telemetry = indices
        .into_iter()
        .map(|index| read_power(&*library, index, config.run.sensor_index))
        .collect();
    Ok(telemetry)
}

pub fn show_power(config: &SuiteConfig, formatter: &OutputFormatter) -> Result<()> {
    formatter.print_list(&collect_power(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smi_adapter_gpu::Reading;
    use smi_core::{BackendConfig, MockDeviceSpec, Status};

    #[test]
    fn test_collect_power_from_mock() {
        let config = SuiteConfig {
            backend: BackendConfig::mock().with_mock_devices(vec![
                MockDeviceSpec::sample(0),
                MockDeviceSpec::sample(1).with_restricted_average_power(),
            ]),
            ..SuiteConfig::default()
        };

        let telemetry = collect_power(&config).unwrap();
        assert_eq!(telemetry.len(), 2);
        assert!(telemetry[0].average.value().is_some());
        assert_eq!(telemetry[1].average, Reading::Unavailable(Status::Permission));
    }

    #[test]
    fn test_collect_power_respects_device_selection() {
        let mut config = SuiteConfig {
            backend: BackendConfig::mock(),
            ..SuiteConfig::default()
        };
        config.run.devices = Some(vec![1]);

        let telemetry = collect_power(&config).unwrap();
        assert_eq!(telemetry.len(), 1);
        assert_eq!(telemetry[0].device, 1);
    }

    #[test]
    fn test_collect_power_rejects_unknown_device() {
        let mut config = SuiteConfig {
            backend: BackendConfig::mock(),
            ..SuiteConfig::default()
        };
        config.run.devices = Some(vec![0, 5]);

        let err = collect_power(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GpuError>(),
            Some(GpuError::GpuNotFound(5))
        ));
        assert_eq!(err.to_string(), "GPU not found: 5");
    }
}
