//! Test case interface

use crate::session::Session;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Title and description shown before a case runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    pub title: String,
    pub description: String,
}

impl CaseInfo {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A conformance scenario
///
/// Phases are invoked by [`CaseHarness`](crate::CaseHarness), which
/// guarantees the order set up, run, close. The defaults cover the shared
/// behavior, so most cases only implement [`run`](TestCase::run).
pub trait TestCase {
    /// Stable identifier used for filtering and reports
    fn name(&self) -> &'static str;

    fn info(&self) -> CaseInfo;

    fn set_up(&mut self, session: &mut Session<'_>) -> Result<()> {
        session.set_up()
    }

    /// Exercise the library; an error fails the case
    fn run(&mut self, session: &mut Session<'_>) -> Result<()>;

    fn display_test_info(&self, session: &mut Session<'_>) {
        session.display_test_info(&self.info());
    }

    fn display_results(&self, session: &mut Session<'_>) {
        session.display_results_header();
    }

    fn close(&mut self, session: &mut Session<'_>) -> Result<()> {
        session.close()
    }

    /// Case-specific data for machine-readable reports
    fn details(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
