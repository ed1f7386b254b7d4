//! Subcommand implementations

pub mod devices;
pub mod list;
pub mod run;

use anyhow::{Context, Result};
use smi_adapter_gpu::{check_status, open_library, SmiLibrary};
use smi_core::SuiteConfig;
use std::ops::Deref;
use tracing::{debug, warn};

/// An opened and initialized library, shut down on drop
pub struct InitializedLibrary {
    library: Box<dyn SmiLibrary>,
}

impl InitializedLibrary {
    pub fn open(config: &SuiteConfig) -> Result<Self> {
        let mut library = open_library(&config.backend)
            .with_context(|| format!("Failed to open the {} backend", config.backend.kind))?;
        check_status("rsmi_init", library.init(config.run.init_flags))?;
        debug!("Initialized {} library", library.backend_name());
        Ok(Self { library })
    }
}

impl Deref for InitializedLibrary {
    type Target = dyn SmiLibrary;

    fn deref(&self) -> &Self::Target {
        self.library.as_ref()
    }
}

impl Drop for InitializedLibrary {
    fn drop(&mut self) {
        let status = self.library.shut_down();
        if !status.is_success() {
            warn!("rsmi_shut_down returned {}", status.symbol());
        }
    }
}
