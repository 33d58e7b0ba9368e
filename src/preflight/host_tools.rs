//! Host tool availability checks.

use crate::process;

use super::types::CheckResult;

/// An external program the pipeline executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredTool {
    pub name: &'static str,
    /// Distribution package providing it, for the install hint.
    pub package: &'static str,
    pub purpose: &'static str,
}

/// Programs that must be on `PATH` before the workspace is touched.
pub const REQUIRED_TOOLS: &[RequiredTool] = &[
    RequiredTool {
        name: "dnf",
        package: "dnf",
        purpose: "Required to populate the rootfs and download installer packages",
    },
    RequiredTool {
        name: "createrepo",
        package: "createrepo_c",
        purpose: "Required to index the installer package repository",
    },
    RequiredTool {
        name: "mkisofs",
        package: "genisoimage",
        purpose: "Required to create the ISO image",
    },
    RequiredTool {
        name: "cpio",
        package: "cpio",
        purpose: "Required to archive the rootfs",
    },
    RequiredTool {
        name: "gzip",
        package: "gzip",
        purpose: "Required to compress the rootfs archive",
    },
];

/// Check every tool in `tools`.
pub fn check_host_tools(tools: &[RequiredTool]) -> Vec<CheckResult> {
    tools.iter().map(check_tool_exists).collect()
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &RequiredTool) -> CheckResult {
    match process::which(tool.name) {
        Some(path) => CheckResult::pass_with(tool.name, &path.display().to_string()),
        None => CheckResult::fail(
            tool.name,
            &format!("Not found. Install '{}' package. {}", tool.package, tool.purpose),
        ),
    }
}
