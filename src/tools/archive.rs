//! Rootfs archive: gzip-compressed newc cpio.
//!
//! Equivalent to `cd rootfs && find . -print0 | cpio --null -o -H newc | gzip -9`,
//! but the file list comes from walkdir and the two tools are connected by a
//! pipe, so no shell is involved.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;

use crate::config::DEFAULT_COMPRESSION_LEVEL;
use crate::workspace::ARCHIVE_NAME;

use super::Archiver;

/// cpio | gzip archiver.
#[derive(Debug, Clone)]
pub struct CpioArchiver {
    gzip_level: u32,
}

impl Default for CpioArchiver {
    fn default() -> Self {
        Self {
            gzip_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CpioArchiver {
    pub fn with_level(gzip_level: u32) -> Self {
        Self {
            gzip_level: gzip_level.clamp(1, 9),
        }
    }
}

/// Entries under `root`, relative, sorted, NUL-terminated (cpio `--null`).
pub fn file_list(root: &Path) -> Result<Vec<u8>> {
    let mut list = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .context("walkdir returned a path outside the root")?;
        list.extend_from_slice(rel.as_os_str().as_bytes());
        list.push(0);
    }
    Ok(list)
}

impl Archiver for CpioArchiver {
    fn compress(&self, source_dir: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let archive = dest_dir.join(ARCHIVE_NAME);
        log::info!("Compressing {} ...", source_dir.display());

        let list = file_list(source_dir)?;
        let out = File::create(&archive)
            .with_context(|| format!("Failed to create {}", archive.display()))?;

        let mut cpio = Command::new("cpio")
            .args(["--null", "-o", "-H", "newc", "--quiet"])
            .current_dir(source_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .context("Failed to execute 'cpio'. Is it installed?")?;

        let cpio_out = cpio.stdout.take().context("cpio stdout not captured")?;
        let gzip = Command::new("gzip")
            .arg(format!("-{}", self.gzip_level))
            .stdin(Stdio::from(cpio_out))
            .stdout(Stdio::from(out))
            .spawn();
        let mut gzip = match gzip {
            Ok(child) => child,
            Err(e) => {
                let _ = cpio.kill();
                let _ = cpio.wait();
                return Err(e).context("Failed to execute 'gzip'. Is it installed?");
            }
        };

        // Closing stdin (drop) signals end of the file list.
        let write_result = match cpio.stdin.take() {
            Some(mut stdin) => stdin.write_all(&list),
            None => Ok(()),
        };

        let cpio_status = cpio.wait().context("Failed to wait for cpio")?;
        let gzip_status = gzip.wait().context("Failed to wait for gzip")?;

        write_result.context("Failed to feed file list to cpio")?;
        if !cpio_status.success() {
            bail!("cpio failed (exit code {})", cpio_status.code().unwrap_or(-1));
        }
        if !gzip_status.success() {
            bail!("gzip failed (exit code {})", gzip_status.code().unwrap_or(-1));
        }

        if let Ok(meta) = archive.metadata() {
            log::info!("  Archive: {} ({} MB)", archive.display(), meta.len() / 1024 / 1024);
        }
        Ok(archive)
    }
}
