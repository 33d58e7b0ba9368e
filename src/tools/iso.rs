//! Bootable image assembly with isolinux + mkisofs.
//!
//! Staging tree handed to mkisofs:
//!
//! ```text
//! iso/
//! ├── isolinux.bin
//! ├── isolinux.cfg
//! ├── ldlinux.c32
//! ├── vmlinuz       # newest boot/vmlinuz-* from the rootfs
//! ├── initrd.img    # compressed rootfs
//! └── RPMS/         # installer images only
//! ```

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ISOLINUX_FILES;
use crate::process::Cmd;
use crate::workspace::ARCHIVE_NAME;

use super::{AssembleRequest, ImageAssembler};

/// Name of the kernel inside the staging tree.
pub const STAGED_KERNEL: &str = "vmlinuz";

/// isolinux + mkisofs image assembler.
#[derive(Debug, Clone)]
pub struct MkisofsAssembler {
    isolinux_dir: PathBuf,
    verbose: bool,
}

impl MkisofsAssembler {
    pub fn new(isolinux_dir: PathBuf, verbose: bool) -> Self {
        Self {
            isolinux_dir,
            verbose,
        }
    }

    /// Copy bootloader files, kernel and archive into the staging tree.
    pub fn stage(&self, request: &AssembleRequest<'_>) -> Result<()> {
        for name in ISOLINUX_FILES {
            let src = self.isolinux_dir.join(name);
            fs::copy(&src, request.staging_dir.join(name))
                .with_context(|| format!("Failed to stage {}", src.display()))?;
        }

        let kernel = find_kernel(request.rootfs_dir)?;
        log::info!("Using kernel: {}", kernel.display());
        fs::copy(&kernel, request.staging_dir.join(STAGED_KERNEL))
            .with_context(|| format!("Failed to stage {}", kernel.display()))?;

        fs::copy(request.archive, request.staging_dir.join(ARCHIVE_NAME))
            .with_context(|| format!("Failed to stage {}", request.archive.display()))?;
        Ok(())
    }

    /// mkisofs invocation, run from inside the staging directory.
    pub fn mkisofs_cmd(staging_dir: &Path, output: &Path) -> Cmd {
        Cmd::new("mkisofs")
            .args(["-R", "-l", "-D"])
            .arg("-o")
            .arg(output)
            .args([
                "-b",
                "isolinux.bin",
                "-c",
                "boot.cat",
                "-no-emul-boot",
                "-boot-load-size",
                "4",
                "-boot-info-table",
                ".",
            ])
            .dir(staging_dir)
            .error_msg("mkisofs failed")
    }
}

impl ImageAssembler for MkisofsAssembler {
    fn assemble(&self, request: &AssembleRequest<'_>) -> Result<PathBuf> {
        self.stage(request)?;

        log::info!("Creating image {} ...", request.output.display());
        Self::mkisofs_cmd(request.staging_dir, request.output).run_verbose(self.verbose)?;

        if !request.output.is_file() {
            bail!(
                "mkisofs reported success but {} was not created",
                request.output.display()
            );
        }
        Ok(request.output.to_path_buf())
    }
}

/// Pick the kernel to boot from `rootfs/boot`.
///
/// Prefers the highest-versioned `vmlinuz-*` that is not a dracut rescue
/// kernel; falls back to a rescue kernel if that is all there is.
pub fn find_kernel(rootfs: &Path) -> Result<PathBuf> {
    let boot = rootfs.join("boot");
    let entries = fs::read_dir(&boot)
        .with_context(|| format!("No kernel found: cannot read {}", boot.display()))?;

    let mut kernels: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("vmlinuz-"))
        })
        .collect();
    kernels.sort_by_cached_key(|p| {
        version_key(&p.file_name().unwrap_or_default().to_string_lossy())
    });

    let is_rescue = |p: &Path| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("rescue"))
    };

    kernels
        .iter()
        .rev()
        .find(|p| !is_rescue(p.as_path()))
        .or_else(|| kernels.last())
        .cloned()
        .with_context(|| format!("No vmlinuz-* kernel found in {}", boot.display()))
}

/// Sort key comparing digit runs numerically: `5.10.0-136` > `5.10.0-60`.
fn version_key(s: &str) -> Vec<(String, u64)> {
    let mut key = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if !digits.is_empty() {
                key.push((std::mem::take(&mut text), digits.parse().unwrap_or(u64::MAX)));
                digits.clear();
            }
            text.push(c);
        }
    }
    key.push((text, digits.parse().unwrap_or(0)));
    key
}
