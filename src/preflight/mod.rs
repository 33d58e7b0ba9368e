//! Environment validation.
//!
//! Confirms every external tool the pipeline runs is resolvable before the
//! workspace is wiped, so a host that cannot build never loses a previous
//! working output.

mod host_tools;
mod types;

pub use host_tools::{check_host_tools, RequiredTool, REQUIRED_TOOLS};
pub use types::{CheckResult, CheckStatus, PreflightReport};

use crate::error::EnvironmentError;

/// Check `tools` and fail with every missing name if any is absent.
pub fn validate_environment(tools: &[RequiredTool]) -> Result<PreflightReport, EnvironmentError> {
    log::info!("Checking host tools...");
    let report = PreflightReport {
        checks: check_host_tools(tools),
    };
    report.log();

    if !report.all_passed() {
        return Err(EnvironmentError {
            missing: report.failed_names(),
        });
    }
    Ok(report)
}
