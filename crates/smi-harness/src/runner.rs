//! Suite runner

use crate::case::{CaseInfo, TestCase};
use crate::console::Console;
use crate::lifecycle::CaseHarness;
use crate::power_read::PowerRead;
use crate::report::{CaseReport, Outcome, SuiteReport};
use crate::session::Session;
use crate::Result;
use chrono::Utc;
use smi_adapter_gpu::SmiLibrary;
use smi_core::RunParams;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Every case shipped with the harness
pub fn builtin_cases() -> Vec<Box<dyn TestCase>> {
    vec![Box::new(PowerRead::new())]
}

/// Runs registered cases one after another against a library
pub struct SuiteRunner {
    params: RunParams,
    console: Console,
    cases: Vec<Box<dyn TestCase>>,
}

impl SuiteRunner {
    pub fn new(params: RunParams, console: Console) -> Self {
        Self {
            params,
            console,
            cases: Vec::new(),
        }
    }

    /// Runner with [`builtin_cases`] registered
    pub fn with_builtin_cases(params: RunParams, console: Console) -> Self {
        let mut runner = Self::new(params, console);
        for case in builtin_cases() {
            runner.register(case);
        }
        runner
    }

    pub fn register(&mut self, case: Box<dyn TestCase>) {
        debug!("Registered case {}", case.name());
        self.cases.push(case);
    }

    pub fn case_names(&self) -> Vec<&'static str> {
        self.cases.iter().map(|c| c.name()).collect()
    }

    pub fn case_infos(&self) -> Vec<(&'static str, CaseInfo)> {
        self.cases.iter().map(|c| (c.name(), c.info())).collect()
    }

    /// Run every case the filter selects
    pub fn run(mut self, library: &mut dyn SmiLibrary) -> SuiteReport {
        let started_at = Utc::now();
        let backend = library.backend_name().to_string();
        info!(
            backend = %backend,
            iterations = self.params.iterations,
            "Starting suite with {} registered cases",
            self.cases.len()
        );

        let cases = std::mem::take(&mut self.cases);
        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            if !self.params.selects(case.name()) {
                debug!("Case {} excluded by filter", case.name());
                continue;
            }
            reports.push(self.run_case(case, &mut *library));
        }
        self.console.flush();

        let report = SuiteReport {
            backend,
            started_at,
            finished_at: Utc::now(),
            cases: reports,
        };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Suite finished"
        );
        report
    }

    fn run_case(&mut self, case: Box<dyn TestCase>, library: &mut dyn SmiLibrary) -> CaseReport {
        let start = Instant::now();
        let name = case.name();
        let title = case.info().title;
        info!("Running case {}", name);

        let session = Session::new(library, &mut self.console, &self.params);
        let mut harness = CaseHarness::new(case, session);

        if let Err(e) = run_phases(&mut harness) {
            error!("Case {} aborted: {}", name, e);
        }
        // Close runs no matter how far the case got
        if let Err(e) = harness.close() {
            warn!("Case {} did not close cleanly: {}", name, e);
        }

        let outcome = harness
            .outcome()
            .cloned()
            .unwrap_or_else(|| Outcome::Failed {
                reason: "Case did not reach its run phase".to_string(),
            });
        let details = harness.details();

        CaseReport {
            name: name.to_string(),
            title,
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
            details,
        }
    }
}

fn run_phases(harness: &mut CaseHarness<'_>) -> Result<()> {
    harness.display_test_info()?;
    harness.set_up()?;
    harness.run()?;
    harness.display_results()?;
    Ok(())
}
