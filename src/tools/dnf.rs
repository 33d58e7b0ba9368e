//! dnf: rootfs population and RPM download.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::process::Cmd;
use crate::workspace::install_repo_file;

use super::RootfsPopulator;

const DNF: &str = "dnf";

/// dnf invocation settings shared by install and download.
#[derive(Debug, Clone, Default)]
pub struct Dnf {
    verbose: bool,
    release_version: Option<String>,
    cancel: CancelToken,
}

impl Dnf {
    pub fn new(verbose: bool, release_version: Option<String>) -> Self {
        Self {
            verbose,
            release_version,
            cancel: CancelToken::new(),
        }
    }

    /// Stop package loops once `cancel` trips.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fails once the run was cancelled; checked between packages.
    pub fn check_cancelled(&self) -> Result<()> {
        Ok(self.cancel.check()?)
    }

    fn common(&self, cmd: Cmd) -> Cmd {
        let cmd = cmd.arg_if(!self.verbose, "-q");
        match self.release_version {
            Some(ref v) => cmd.arg(format!("--releasever={}", v)),
            None => cmd,
        }
    }

    /// `dnf install <pkg> --installroot <root> -y`
    pub fn install_cmd(&self, package: &str, root: &Path) -> Cmd {
        self.common(
            Cmd::new(DNF)
                .arg("install")
                .arg(package)
                .arg("--installroot")
                .arg(root)
                .arg("-y"),
        )
        .error_msg(format!("dnf install {} failed", package))
    }

    /// `dnf download --resolve --alldeps --destdir <dir> --installroot <root> <pkg>`
    pub fn download_cmd(&self, package: &str, dest_dir: &Path, root: &Path) -> Cmd {
        self.common(
            Cmd::new(DNF)
                .args(["download", "--resolve", "--alldeps"])
                .arg("--destdir")
                .arg(dest_dir)
                .arg("--installroot")
                .arg(root),
        )
        .arg(package)
        .error_msg(format!("dnf download {} failed", package))
    }
}

impl RootfsPopulator for Dnf {
    fn install(&self, target_dir: &Path, packages: &[String], repo_file: &Path) -> Result<()> {
        log::info!("Fetching and installing {} packages ...", packages.len());

        install_repo_file(target_dir, repo_file).with_context(|| {
            format!("Failed to copy {} into {}", repo_file.display(), target_dir.display())
        })?;

        let mut seen = HashSet::new();
        for package in packages {
            if !seen.insert(package.as_str()) {
                log::debug!("  {} already installed, skipping", package);
                continue;
            }
            self.check_cancelled()?;
            log::info!("  Installing: {}", package);
            self.install_cmd(package, target_dir).run_verbose(self.verbose)?;
        }

        log::info!("Installed {} packages", seen.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Interrupted;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_install_cmd_quiet_by_default() {
        let cmd = Dnf::default().install_cmd("bash", Path::new("/work/rootfs"));
        assert_eq!(
            cmd.describe(),
            "dnf install bash --installroot /work/rootfs -y -q"
        );
    }

    #[test]
    fn test_install_cmd_verbose_with_release() {
        let dnf = Dnf::new(true, Some("22.03LTS".into()));
        let cmd = dnf.install_cmd("kernel", Path::new("/work/rootfs"));
        assert_eq!(
            cmd.describe(),
            "dnf install kernel --installroot /work/rootfs -y --releasever=22.03LTS"
        );
    }

    #[test]
    fn test_download_cmd() {
        let cmd = Dnf::default().download_cmd(
            "vim",
            Path::new("/work/iso/RPMS"),
            Path::new("/work/rootfs"),
        );
        assert_eq!(
            cmd.describe(),
            "dnf download --resolve --alldeps --destdir /work/iso/RPMS --installroot /work/rootfs -q vim"
        );
    }

    #[test]
    fn test_install_stops_when_cancelled() {
        let temp = TempDir::new().unwrap();
        let repo_file = temp.path().join("openEuler.repo");
        fs::write(&repo_file, "[everything]\n").unwrap();
        let rootfs = temp.path().join("rootfs");

        let cancel = CancelToken::new();
        let dnf = Dnf::default().with_cancel(cancel.clone());
        cancel.cancel();

        // No dnf is spawned: the token is checked before every package.
        let packages: Vec<String> = (0..10).map(|i| format!("pkg{}", i)).collect();
        let err = dnf.install(&rootfs, &packages, &repo_file).unwrap_err();

        assert!(err.is::<Interrupted>());
        assert_eq!(err.to_string(), "interrupted by operator");
    }

    #[test]
    fn test_clones_share_cancellation() {
        let cancel = CancelToken::new();
        let dnf = Dnf::new(false, None).with_cancel(cancel.clone());
        let copy = dnf.clone();
        assert!(copy.check_cancelled().is_ok());

        cancel.cancel();
        assert!(copy.check_cancelled().is_err());
        assert!(dnf.check_cancelled().is_err());
    }
}
