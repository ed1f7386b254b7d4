//! Configuration management for rsmitst
//!
//! Provides a layered configuration system that supports YAML/JSON files,
//! environment variables, and command-line overrides applied by the binary.

use crate::{Result, Status, Verbosity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "RSMITST_CONFIG";

/// Prefix for environment overrides, e.g. `RSMITST_RUN__ITERATIONS=5`;
/// nested keys are separated by `__`
pub const ENV_PREFIX: &str = "RSMITST";

/// Complete suite configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Parameters handed to every test case
    pub run: RunParams,

    /// Which SMI library to drive
    pub backend: BackendConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl SuiteConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Configuration file
    /// 3. Defaults (lowest)
    ///
    /// Command-line overrides are applied on top by the caller.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&Self::default())?);

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(config::File::with_name(&config_path).required(true));
        } else {
            for path in &["./rsmitst.yaml", "/etc/rsmitst/config.yaml"] {
                builder = builder.add_source(config::File::with_name(path).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let parsed: Self = builder.build()?.try_deserialize()?;
        parsed.validate()?;

        Ok(parsed)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path));

        let parsed: Self = builder.build()?.try_deserialize()?;
        parsed.validate()?;

        Ok(parsed)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.run.validate()?;
        self.backend.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Parameters shared by every test case in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Number of passes over the monitored devices
    pub iterations: u32,

    /// Transcript verbosity
    pub verbosity: Verbosity,

    /// Flags passed to the library's init call
    pub init_flags: u64,

    /// Sensor index used by per-sensor power queries
    pub sensor_index: u32,

    /// Monitor only these device indices (all devices when unset)
    pub devices: Option<Vec<u32>>,

    /// Run only cases whose name contains this string
    pub filter: Option<String>,
}

impl RunParams {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(crate::Error::config("Iterations must be greater than zero"));
        }

        if let Some(filter) = &self.filter {
            if filter.trim().is_empty() {
                return Err(crate::Error::config("Case filter must not be empty"));
            }
        }

        if let Some(devices) = &self.devices {
            let mut seen = HashSet::new();
            for index in devices {
                if !seen.insert(*index) {
                    return Err(crate::Error::config(format!(
                        "Device {} listed more than once",
                        index
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check whether a case name passes the filter
    pub fn selects(&self, case_name: &str) -> bool {
        match &self.filter {
            Some(filter) => case_name.contains(filter.trim()),
            None => true,
        }
    }
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            iterations: 1,
            verbosity: Verbosity::Standard,
            init_flags: 0,
            sensor_index: 0,
            devices: None,
            filter: None,
        }
    }
}

/// SMI library backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ROCm SMI shared library loaded at runtime
    #[default]
    Rocm,
    /// In-memory library for testing
    Mock,
}

impl std::str::FromStr for BackendKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rocm" => Ok(BackendKind::Rocm),
            "mock" => Ok(BackendKind::Mock),
            _ => Err(crate::Error::parse(format!("Unknown backend: {}", s))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Rocm => write!(f, "rocm"),
            BackendKind::Mock => write!(f, "mock"),
        }
    }
}

/// Backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend to use
    pub kind: BackendKind,

    /// Explicit path to the shared library (rocm backend)
    pub library_path: Option<PathBuf>,

    /// Devices exposed by the mock backend
    pub mock_devices: Vec<MockDeviceSpec>,
}

impl BackendConfig {
    pub fn mock() -> Self {
        Self {
            kind: BackendKind::Mock,
            ..Self::default()
        }
    }

    pub fn with_mock_devices(mut self, devices: Vec<MockDeviceSpec>) -> Self {
        self.mock_devices = devices;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.library_path {
            if path.as_os_str().is_empty() {
                return Err(crate::Error::config("Library path must not be empty"));
            }
        }
        for device in &self.mock_devices {
            device.validate()?;
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Rocm,
            library_path: None,
            mock_devices: vec![MockDeviceSpec::sample(0), MockDeviceSpec::sample(1)],
        }
    }
}

/// Call names a mock fault can be attached to
pub const MOCK_FAULT_CALLS: &[&str] = &[
    "dev_id",
    "dev_name",
    "power_cap",
    "power_cap_default",
    "power_cap_range",
    "power_ave",
];

/// One device exposed by the mock backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockDeviceSpec {
    /// PCI device id
    pub id: u16,

    /// Marketing name
    pub name: String,

    /// Current power cap in microwatts
    pub power_cap_uw: u64,

    /// Default power cap in microwatts
    pub default_power_cap_uw: u64,

    /// Lower bound of the settable cap range
    pub cap_min_uw: u64,

    /// Upper bound of the settable cap range
    pub cap_max_uw: u64,

    /// Average power draw in microwatts
    pub average_power_uw: u64,

    /// Average power requires elevated privileges
    pub average_power_restricted: bool,

    /// Status forced onto a call, keyed by a name from [`MOCK_FAULT_CALLS`]
    pub faults: HashMap<String, Status>,
}

impl MockDeviceSpec {
    /// A plausible datacenter GPU; `index` varies the values, repeating
    /// every eight devices
    pub fn sample(index: u32) -> Self {
        let step = u64::from(index % 8) * 25_000_000;
        Self {
            id: 0x740f + (index % 8) as u16,
            name: format!("Mock Instinct {}", index),
            power_cap_uw: 300_000_000 - step,
            default_power_cap_uw: 300_000_000,
            cap_min_uw: 0,
            cap_max_uw: 300_000_000,
            average_power_uw: 150_000_000 + step,
            average_power_restricted: false,
            faults: HashMap::new(),
        }
    }

    /// Force `status` onto the named call
    pub fn with_fault(mut self, call: impl Into<String>, status: Status) -> Self {
        self.faults.insert(call.into(), status);
        self
    }

    pub fn with_restricted_average_power(mut self) -> Self {
        self.average_power_restricted = true;
        self
    }

    pub fn fault(&self, call: &str) -> Option<Status> {
        self.faults.get(call).copied()
    }

    /// Reject fault keys that no mock call would ever match
    pub fn validate(&self) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .faults
            .keys()
            .map(String::as_str)
            .filter(|call| !MOCK_FAULT_CALLS.contains(call))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }

        unknown.sort_unstable();
        Err(crate::Error::config(format!(
            "Mock device '{}' has faults for unknown calls: {} (expected one of: {})",
            self.name,
            unknown.join(", "),
            MOCK_FAULT_CALLS.join(", ")
        )))
    }
}

impl Default for MockDeviceSpec {
    fn default() -> Self {
        Self::sample(0)
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// Log format (json or text)
    pub format: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        match self.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(crate::Error::config(format!(
                "Log format must be 'text' or 'json', got '{}'",
                other
            ))),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SuiteConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.run.iterations, 1);
        assert_eq!(config.run.verbosity, Verbosity::Standard);
        assert_eq!(config.backend.kind, BackendKind::Rocm);
        assert_eq!(config.backend.mock_devices.len(), 2);
    }

    #[test]
    fn test_run_params_validation() {
        let mut params = RunParams::default();
        assert!(params.validate().is_ok());

        params.iterations = 0;
        assert!(params.validate().is_err());

        params.iterations = 3;
        params.filter = Some("  ".to_string());
        assert!(params.validate().is_err());

        params.filter = None;
        params.devices = Some(vec![0, 1, 0]);
        assert!(params.validate().is_err());

        params.devices = Some(vec![0, 1]);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_case_filter() {
        let mut params = RunParams::default();
        assert!(params.selects("power_read"));

        params.filter = Some("power".to_string());
        assert!(params.selects("power_read"));
        assert!(!params.selects("temp_read"));
    }

    #[test]
    fn test_logging_validation() {
        let mut logging = LoggingConfig::default();
        assert!(logging.validate().is_ok());
        assert!(!logging.is_json());

        logging.format = "json".to_string();
        assert!(logging.is_json());

        logging.format = "xml".to_string();
        assert!(logging.validate().is_err());
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("rocm".parse::<BackendKind>().unwrap(), BackendKind::Rocm);
        assert_eq!("MOCK".parse::<BackendKind>().unwrap(), BackendKind::Mock);
        assert!("nvml".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_mock_device_spec_builders() {
        let spec = MockDeviceSpec::sample(1)
            .with_fault("power_cap", Status::NotSupported)
            .with_restricted_average_power();

        assert_eq!(spec.fault("power_cap"), Some(Status::NotSupported));
        assert_eq!(spec.fault("power_ave"), None);
        assert!(spec.average_power_restricted);
        assert_eq!(spec.power_cap_uw, 275_000_000);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
run:
  iterations: 4
  verbosity: progress
  devices: [1]
backend:
  kind: mock
  mock_devices:
    - id: 29711
      name: "Test GPU"
      power_cap_uw: 200000000
      default_power_cap_uw: 250000000
      cap_min_uw: 100000000
      cap_max_uw: 250000000
      average_power_uw: 90000000
      average_power_restricted: true
logging:
  level: debug
"#
        )
        .unwrap();

        let config = SuiteConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.run.iterations, 4);
        assert_eq!(config.run.verbosity, Verbosity::Progress);
        assert_eq!(config.run.devices, Some(vec![1]));
        assert_eq!(config.backend.kind, BackendKind::Mock);
        assert_eq!(config.backend.mock_devices.len(), 1);
        assert_eq!(config.backend.mock_devices[0].name, "Test GPU");
        assert!(config.backend.mock_devices[0].average_power_restricted);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unknown_fault_key_rejected() {
        let backend = BackendConfig::mock().with_mock_devices(vec![
            MockDeviceSpec::sample(0).with_fault("power_ave", Status::NotSupported),
            MockDeviceSpec::sample(1).with_fault("power_average", Status::NotSupported),
        ]);
        let config = SuiteConfig {
            backend,
            ..SuiteConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("power_average"));

        for call in MOCK_FAULT_CALLS {
            let spec = MockDeviceSpec::sample(0).with_fault(*call, Status::Busy);
            assert!(spec.validate().is_ok(), "{} should be accepted", call);
        }
    }

    #[test]
    fn test_unknown_fault_key_in_file_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "backend:\n  kind: mock\n  mock_devices:\n    - name: typo\n      faults:\n        power_average: not_supported\n"
        )
        .unwrap();

        let result = SuiteConfig::load_from_file(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_handles_large_indices() {
        let spec = MockDeviceSpec::sample(40);
        assert_eq!(spec.name, "Mock Instinct 40");
        assert_eq!(spec.id, 0x740f);
        assert_eq!(spec.power_cap_uw, 300_000_000);
        assert!(spec.power_cap_uw <= spec.cap_max_uw);

        let spec = MockDeviceSpec::sample(u32::MAX);
        assert!(spec.power_cap_uw > 0);
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "run:\n  iterations: 4\n  verbosity: progress\n").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, file.path());
        std::env::set_var("RSMITST_RUN__ITERATIONS", "7");
        std::env::set_var("RSMITST_BACKEND__KIND", "mock");
        let result = SuiteConfig::load();
        std::env::remove_var(CONFIG_ENV_VAR);
        std::env::remove_var("RSMITST_RUN__ITERATIONS");
        std::env::remove_var("RSMITST_BACKEND__KIND");

        let config = result.unwrap();
        assert_eq!(config.run.iterations, 7);
        assert_eq!(config.run.verbosity, Verbosity::Progress);
        assert_eq!(config.backend.kind, BackendKind::Mock);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "run:\n  iterations: 0\n").unwrap();

        let result = SuiteConfig::load_from_file(file.path());
        assert!(result.is_err());
    }
}
