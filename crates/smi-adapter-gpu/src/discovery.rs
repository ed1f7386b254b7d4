//! GPU discovery

use crate::library::SmiLibrary;
use crate::{check_status, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identity of one monitored device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Device index as used by every library call
    pub index: u32,

    /// PCI device id
    pub id: u16,

    /// Marketing name
    pub name: String,
}

impl DeviceDescriptor {
    /// Read the identity of device `index`
    pub fn query(library: &dyn SmiLibrary, index: u32) -> Result<Self> {
        let mut id = 0u16;
        check_status("rsmi_dev_id_get", library.dev_id(index, Some(&mut id)))?;

        let mut name = String::new();
        check_status("rsmi_dev_name_get", library.dev_name(index, Some(&mut name)))?;

        Ok(Self { index, id, name })
    }
}

/// Number of devices the library monitors
pub fn monitor_device_count(library: &dyn SmiLibrary) -> Result<u32> {
    let mut count = 0u32;
    check_status(
        "rsmi_num_monitor_devices",
        library.num_monitor_devices(Some(&mut count)),
    )?;
    Ok(count)
}

/// Discover all monitored devices
///
/// The library must already be initialized.
pub fn discover_devices(library: &dyn SmiLibrary) -> Result<Vec<DeviceDescriptor>> {
    let count = monitor_device_count(library)?;
    debug!("{} backend reports {} monitored devices", library.backend_name(), count);

    (0..count)
        .map(|index| DeviceDescriptor::query(library, index))
        .collect()
}
