//! `run`: execute the conformance suite

use crate::output::OutputFormatter;
use anyhow::{bail, Context, Result};
use smi_adapter_gpu::open_library;
use smi_core::SuiteConfig;
use smi_harness::{Console, SuiteReport, SuiteRunner};
use std::io;

/// Run every selected case and collect the report
///
/// The transcript goes to stdout, or to stderr when stdout carries a
/// structured report.
pub fn execute(config: &SuiteConfig, transcript_to_stderr: bool) -> Result<SuiteReport> {
    let mut library = open_library(&config.backend)
        .with_context(|| format!("Failed to open the {} backend", config.backend.kind))?;

    let verbosity = config.run.verbosity;
    let console = if transcript_to_stderr {
        Console::new(verbosity, io::stderr())
    } else {
        Console::stdout(verbosity)
    };

    let runner = SuiteRunner::with_builtin_cases(config.run.clone(), console);
    Ok(runner.run(library.as_mut()))
}

pub fn run_suite(config: &SuiteConfig, formatter: &OutputFormatter) -> Result<()> {
    let report = execute(config, formatter.format().is_structured())?;
    formatter.print_report(&report)?;

    if !report.is_success() {
        bail!(
            "{} of {} test cases failed",
            report.failed(),
            report.cases.len()
        );
    }
    Ok(())
}
