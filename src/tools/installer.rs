//! Installer rootfs customization.
//!
//! Runs after the base system is installed:
//! 1. installs the installer tooling packages
//! 2. enables root autologin on tty1 and ttyS0
//! 3. records which packages the on-media repository carries

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolve::PackagePlan;

use super::{RootfsPopulator, Specializer};

const GETTY_AUTOLOGIN: &str = include_str!("../../profile/installer/getty-autologin.conf");
const SERIAL_GETTY_AUTOLOGIN: &str =
    include_str!("../../profile/installer/serial-getty-autologin.conf");

/// Drop-in directories (relative to the rootfs) that get an autologin override.
pub const AUTOLOGIN_DROPINS: [(&str, &str); 2] = [
    ("etc/systemd/system/getty@tty1.service.d", GETTY_AUTOLOGIN),
    ("etc/systemd/system/serial-getty@ttyS0.service.d", SERIAL_GETTY_AUTOLOGIN),
];

/// Where the installer finds the list of packages it can install.
pub const TARGET_MANIFEST: &str = "etc/omni-imager/target-packages.json";

#[derive(Debug, Serialize)]
struct TargetManifest<'a> {
    packages: &'a [String],
}

/// Installer specializer: tooling install plus boot-time configuration.
pub struct InstallerSetup<P> {
    populator: P,
    tool_packages: Vec<String>,
}

impl<P: RootfsPopulator> InstallerSetup<P> {
    pub fn new(populator: P, tool_packages: Vec<String>) -> Self {
        Self {
            populator,
            tool_packages,
        }
    }
}

impl<P: RootfsPopulator> Specializer for InstallerSetup<P> {
    fn specialize(&self, rootfs: &Path, plan: &PackagePlan, repo_file: &Path) -> Result<()> {
        if self.tool_packages.is_empty() {
            log::info!("No installer tooling configured");
        } else {
            log::info!("Installing installer tooling ...");
            self.populator
                .install(rootfs, &self.tool_packages, repo_file)
                .context("Failed to install installer tooling")?;
        }

        if plan.auto_login {
            enable_autologin(rootfs)?;
        }

        let manifest = write_target_manifest(rootfs, &plan.extra)?;
        log::debug!("  Wrote {}", manifest.display());
        Ok(())
    }
}

/// Install getty drop-ins that log root in automatically.
pub fn enable_autologin(rootfs: &Path) -> Result<()> {
    log::info!("Enabling root autologin");
    for (dir, content) in AUTOLOGIN_DROPINS {
        let dir = rootfs.join(dir);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::write(dir.join("autologin.conf"), content)
            .with_context(|| format!("Failed to write autologin drop-in in {}", dir.display()))?;
    }
    Ok(())
}

/// Write `{"packages": [...]}` for the installer to read at runtime.
pub fn write_target_manifest(rootfs: &Path, packages: &[String]) -> Result<PathBuf> {
    let path = rootfs.join(TARGET_MANIFEST);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&TargetManifest { packages })?;
    fs::write(&path, json + "\n").with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
