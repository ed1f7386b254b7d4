//! Case lifecycle state machine

use crate::case::{CaseInfo, TestCase};
use crate::report::Outcome;
use crate::session::Session;
use crate::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use smi_core::Verbosity;
use std::fmt;
use tracing::{debug, error, info};

/// Lifecycle position of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    SetUp,
    Running,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Created => "created",
            LifecycleState::SetUp => "set up",
            LifecycleState::Running => "running",
            LifecycleState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Drives one test case through set up, run and close
///
/// Out-of-order calls are rejected with [`HarnessError::InvalidTransition`]
/// instead of reaching the case.
pub struct CaseHarness<'a> {
    case: Box<dyn TestCase>,
    session: Session<'a>,
    state: LifecycleState,
    outcome: Option<Outcome>,
}

impl<'a> CaseHarness<'a> {
    pub fn new(case: Box<dyn TestCase>, session: Session<'a>) -> Self {
        Self {
            case,
            session,
            state: LifecycleState::Created,
            outcome: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.case.name()
    }

    pub fn info(&self) -> CaseInfo {
        self.case.info()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Outcome of the run phase, if it happened
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn session(&self) -> &Session<'a> {
        &self.session
    }

    pub fn details(&self) -> serde_json::Value {
        self.case.details()
    }

    fn require(&self, action: &'static str, allowed: &[LifecycleState]) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(HarnessError::InvalidTransition {
            case: self.case.name().to_string(),
            action,
            state: self.state,
        })
    }

    /// Created → SetUp
    ///
    /// A failing set-up does not abort: it is recorded on the session and the
    /// run phase skips the case.
    pub fn set_up(&mut self) -> Result<()> {
        self.require("set up", &[LifecycleState::Created])?;

        if let Err(e) = self.case.set_up(&mut self.session) {
            self.session.mark_setup_failed(e.to_string());
        }
        self.state = LifecycleState::SetUp;
        debug!("Case {} set up", self.case.name());
        Ok(())
    }

    /// SetUp → Running
    pub fn run(&mut self) -> Result<Outcome> {
        self.require("run", &[LifecycleState::SetUp])?;
        self.state = LifecycleState::Running;

        let outcome = if let Some(reason) = self.session.setup_failure().map(str::to_string) {
            self.session.console().say(
                Verbosity::Min,
                "** SetUp Failed for this test. Skipping.**",
            );
            info!("Skipping case {}: {}", self.case.name(), reason);
            Outcome::Skipped { reason }
        } else {
            self.session.run_header();
            match self.case.run(&mut self.session) {
                Ok(()) => Outcome::Passed,
                Err(e) => {
                    error!("Case {} failed: {}", self.case.name(), e);
                    Outcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    pub fn display_test_info(&mut self) -> Result<()> {
        self.require(
            "display info for",
            &[LifecycleState::Created, LifecycleState::SetUp, LifecycleState::Running],
        )?;
        self.case.display_test_info(&mut self.session);
        Ok(())
    }

    pub fn display_results(&mut self) -> Result<()> {
        self.require(
            "display results for",
            &[LifecycleState::Created, LifecycleState::SetUp, LifecycleState::Running],
        )?;
        self.case.display_results(&mut self.session);
        Ok(())
    }

    /// Any open state → Closed
    ///
    /// The state is Closed afterwards even when closing reports an error; a
    /// passed case then becomes failed.
    pub fn close(&mut self) -> Result<()> {
        self.require(
            "close",
            &[LifecycleState::Created, LifecycleState::SetUp, LifecycleState::Running],
        )?;

        let result = self.case.close(&mut self.session);
        self.state = LifecycleState::Closed;
        self.session.console().flush();

        if let Err(e) = &result {
            error!("Closing case {} failed: {}", self.case.name(), e);
            if matches!(self.outcome, Some(Outcome::Passed)) {
                self.outcome = Some(Outcome::Failed {
                    reason: format!("Close failed: {}", e),
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{Console, SharedBuffer};
    use smi_adapter_gpu::MockSmiLibrary;
    use smi_core::{MockDeviceSpec, RunParams, Status};

    #[derive(Default)]
    struct ScriptedCase {
        fail_run: bool,
        fail_close: bool,
    }

    impl TestCase for ScriptedCase {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn info(&self) -> CaseInfo {
            CaseInfo::new("Scripted Test", "Follows a fixed script.")
        }

        fn run(&mut self, session: &mut Session<'_>) -> Result<()> {
            if self.fail_run {
                return Err(session.fail_invariant(0, "scripted failure"));
            }
            Ok(())
        }

        fn close(&mut self, session: &mut Session<'_>) -> Result<()> {
            session.close()?;
            if self.fail_close {
                return session.check("rsmi_shut_down", None, Status::InternalException);
            }
            Ok(())
        }
    }

    fn library() -> MockSmiLibrary {
        MockSmiLibrary::new(vec![MockDeviceSpec::sample(0)])
    }

    #[test]
    fn test_full_lifecycle() {
        let mut library = library();
        let mut console = Console::new(Verbosity::Min, std::io::sink());
        let params = RunParams::default();

        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(ScriptedCase::default()), session);
        assert_eq!(harness.state(), LifecycleState::Created);

        harness.display_test_info().unwrap();
        harness.set_up().unwrap();
        assert_eq!(harness.state(), LifecycleState::SetUp);
        assert_eq!(harness.run().unwrap(), Outcome::Passed);
        assert_eq!(harness.state(), LifecycleState::Running);
        harness.display_results().unwrap();
        harness.close().unwrap();
        assert_eq!(harness.state(), LifecycleState::Closed);
        drop(harness);

        assert_eq!(library.shutdown_calls(), 1);
        assert!(!library.is_initialized());
    }

    #[test]
    fn test_run_requires_set_up() {
        let mut library = library();
        let mut console = Console::new(Verbosity::Min, std::io::sink());
        let params = RunParams::default();

        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(ScriptedCase::default()), session);

        let err = harness.run().unwrap_err();
        assert!(matches!(
            err,
            HarnessError::InvalidTransition {
                action: "run",
                state: LifecycleState::Created,
                ..
            }
        ));
        assert_eq!(harness.state(), LifecycleState::Created);
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut library = library();
        let mut console = Console::new(Verbosity::Min, std::io::sink());
        let params = RunParams::default();

        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(ScriptedCase::default()), session);
        harness.close().unwrap();

        assert!(harness.close().is_err());
        assert!(harness.set_up().is_err());
        assert!(harness.display_results().is_err());
        assert!(harness.display_test_info().is_err());
        assert_eq!(
            harness.set_up().unwrap_err().to_string(),
            "Cannot set up case 'scripted' while it is closed"
        );
    }

    #[test]
    fn test_set_up_twice_rejected() {
        let mut library = library();
        let mut console = Console::new(Verbosity::Min, std::io::sink());
        let params = RunParams::default();

        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(ScriptedCase::default()), session);
        harness.set_up().unwrap();
        assert!(harness.set_up().is_err());
        harness.close().unwrap();
    }

    #[test]
    fn test_failed_set_up_skips_run() {
        let mut library = library().with_init_status(Status::InitError);
        let buffer = SharedBuffer::default();
        let mut console = Console::new(Verbosity::Min, buffer.clone());
        let params = RunParams::default();

        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(ScriptedCase::default()), session);
        harness.set_up().unwrap();

        let outcome = harness.run().unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));
        assert!(buffer
            .contents()
            .contains("** SetUp Failed for this test. Skipping.**"));

        harness.close().unwrap();
        assert!(matches!(harness.outcome(), Some(Outcome::Skipped { .. })));
    }

    #[test]
    fn test_run_failure_is_recorded() {
        let mut library = library();
        let mut console = Console::new(Verbosity::Min, std::io::sink());
        let params = RunParams::default();

        let case = ScriptedCase {
            fail_run: true,
            ..Default::default()
        };
        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(case), session);
        harness.set_up().unwrap();

        match harness.run().unwrap() {
            Outcome::Failed { reason } => assert!(reason.contains("scripted failure")),
            other => panic!("unexpected outcome {:?}", other),
        }
        harness.close().unwrap();
    }

    #[test]
    fn test_close_failure_fails_passed_case() {
        let mut library = library();
        let mut console = Console::new(Verbosity::Min, std::io::sink());
        let params = RunParams::default();

        let case = ScriptedCase {
            fail_close: true,
            ..Default::default()
        };
        let session = Session::new(&mut library, &mut console, &params);
        let mut harness = CaseHarness::new(Box::new(case), session);
        harness.set_up().unwrap();
        assert_eq!(harness.run().unwrap(), Outcome::Passed);

        assert!(harness.close().is_err());
        assert_eq!(harness.state(), LifecycleState::Closed);
        assert!(matches!(harness.outcome(), Some(Outcome::Failed { .. })));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LifecycleState::SetUp.to_string(), "set up");
        assert_eq!(LifecycleState::Running.to_string(), "running");
    }
}
