//! Power read conformance case
//!
//! For every iteration and every monitored device, reads the current power
//! cap, the default cap, the settable cap range and the average power draw.
//! The first three must succeed. Average power may be refused for lack of
//! privileges. The library must also reject a null output for average power
//! with `InvalidArgs`.

use crate::case::{CaseInfo, TestCase};
use crate::session::{Access, Session};
use crate::Result;
use serde::{Deserialize, Serialize};
use smi_core::{Microwatts, PowerCapRange, Status, Verbosity};
use tracing::{debug, warn};

/// Average power as seen by the case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragePower {
    Measured(Microwatts),
    PermissionDenied,
}

/// Values read from one device during one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub iteration: u32,
    pub device: u32,
    pub current_cap: Microwatts,
    pub default_cap: Microwatts,
    pub cap_range: PowerCapRange,
    pub average: AveragePower,
}

/// The power read case
#[derive(Debug, Default)]
pub struct PowerRead {
    samples: Vec<PowerSample>,
}

impl PowerRead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples collected by the last run
    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    fn read_device(
        session: &mut Session<'_>,
        iteration: u32,
        dv_ind: u32,
        sensor: u32,
    ) -> Result<PowerSample> {
        let mut cap = 0u64;
        let status = session.library().dev_power_cap(dv_ind, sensor, Some(&mut cap));
        session.check("rsmi_dev_power_cap_get", Some(dv_ind), status)?;
        let current_cap = Microwatts(cap);
        session.console().say(
            Verbosity::Standard,
            format_args!("\t**Current Power Cap: {}", current_cap),
        );

        let mut default_cap = 0u64;
        let status = session
            .library()
            .dev_power_cap_default(dv_ind, Some(&mut default_cap));
        session.check("rsmi_dev_power_cap_default_get", Some(dv_ind), status)?;
        let default_cap = Microwatts(default_cap);
        session.console().say(
            Verbosity::Standard,
            format_args!("\t**Default Power Cap: {}", default_cap),
        );

        let (mut max, mut min) = (0u64, 0u64);
        let status = session.library().dev_power_cap_range(
            dv_ind,
            sensor,
            Some(&mut max),
            Some(&mut min),
        );
        session.check("rsmi_dev_power_cap_range_get", Some(dv_ind), status)?;
        let cap_range = PowerCapRange::new(min, max);
        session.console().say(
            Verbosity::Standard,
            format_args!("\t**Power Cap Range: {}", cap_range),
        );

        if !cap_range.is_ordered() {
            return Err(session.fail_invariant(
                dv_ind,
                format!(
                    "power cap range minimum {} exceeds maximum {}",
                    cap_range.min, cap_range.max
                ),
            ));
        }
        if !cap_range.contains(current_cap) {
            warn!(
                device = dv_ind,
                "Current power cap {} lies outside the settable range {}",
                current_cap,
                cap_range
            );
        }

        let mut power = 0u64;
        let status = session.library().dev_power_ave(dv_ind, sensor, Some(&mut power));
        let average = match session.check_permission("rsmi_dev_power_ave_get", Some(dv_ind), status)? {
            Access::Granted => {
                let power = Microwatts(power);
                session.console().say(
                    Verbosity::Standard,
                    format_args!("\t**Average Power Usage: {} mW", power.as_milliwatts()),
                );
                AveragePower::Measured(power)
            }
            Access::Denied => AveragePower::PermissionDenied,
        };

        // Null-output check: a null output must be rejected, never written through
        let status = session.library().dev_power_ave(dv_ind, sensor, None);
        session.expect_status(
            "rsmi_dev_power_ave_get",
            Some(dv_ind),
            status,
            Status::InvalidArgs,
        )?;

        Ok(PowerSample {
            iteration,
            device: dv_ind,
            current_cap,
            default_cap,
            cap_range,
            average,
        })
    }
}

impl TestCase for PowerRead {
    fn name(&self) -> &'static str {
        "power_read"
    }

    fn info(&self) -> CaseInfo {
        CaseInfo::new(
            "RSMI Power Read Test",
            "The Power Read tests verifies that power related values can be read properly.",
        )
    }

    fn run(&mut self, session: &mut Session<'_>) -> Result<()> {
        self.samples.clear();
        let sensor = session.params().sensor_index;
        let devices = session.devices().to_vec();

        for iteration in 0..session.num_iterations() {
            debug!("Power read iteration {}", iteration);
            for &dv_ind in &devices {
                session.print_device_header(dv_ind)?;
                let sample = Self::read_device(session, iteration, dv_ind, sensor)?;
                self.samples.push(sample);
            }
        }
        Ok(())
    }

    fn display_results(&self, session: &mut Session<'_>) {
        session.display_results_header();

        let denied = self
            .samples
            .iter()
            .filter(|s| s.average == AveragePower::PermissionDenied)
            .count();
        session.console().say(
            Verbosity::Standard,
            format_args!("\t{} power samples collected", self.samples.len()),
        );
        if denied > 0 {
            session.console().say(
                Verbosity::Standard,
                format_args!("\tAverage power unreadable without root on {} samples", denied),
            );
        }
    }

    fn details(&self) -> serde_json::Value {
        serde_json::to_value(&self.samples).unwrap_or_default()
    }
}
