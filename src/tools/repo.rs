//! Installer package repository: `dnf download` + `createrepo`.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::process::Cmd;

use super::{Dnf, RepoBuilder};

/// Repository builder backed by dnf and createrepo.
#[derive(Debug, Clone)]
pub struct RpmRepoBuilder {
    dnf: Dnf,
    verbose: bool,
}

impl RpmRepoBuilder {
    pub fn new(dnf: Dnf, verbose: bool) -> Self {
        Self { dnf, verbose }
    }

    pub fn createrepo_cmd(dest_dir: &Path) -> Cmd {
        Cmd::new("createrepo")
            .arg(dest_dir)
            .error_msg("createrepo failed")
    }
}

impl RepoBuilder for RpmRepoBuilder {
    fn download(&self, dest_dir: &Path, packages: &[String], resolve_root: &Path) -> Result<()> {
        fs::create_dir_all(dest_dir)
            .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

        log::info!("Downloading {} packages for the installer repository ...", packages.len());
        for package in packages {
            self.dnf.check_cancelled()?;
            log::info!("  Downloading: {}", package);
            self.dnf
                .download_cmd(package, dest_dir, resolve_root)
                .run_verbose(self.verbose)?;
        }
        Ok(())
    }

    fn index_repository(&self, dest_dir: &Path) -> Result<()> {
        log::info!("Indexing repository {}", dest_dir.display());
        Self::createrepo_cmd(dest_dir).run_verbose(self.verbose)
    }
}
