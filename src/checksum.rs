//! SHA-256 checksum file for the finished image.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Stream `path` through SHA-256 and return the lowercase hex digest.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `<image>.sha256` in `sha256sum` format next to the image.
pub fn write_checksum(image: &Path) -> Result<PathBuf> {
    let digest = sha256_file(image)?;
    let name = image
        .file_name()
        .with_context(|| format!("Image path has no file name: {}", image.display()))?
        .to_string_lossy();

    let mut sum_name = image.as_os_str().to_os_string();
    sum_name.push(CHECKSUM_SUFFIX);
    let sum_path = PathBuf::from(sum_name);

    fs::write(&sum_path, format!("{}  {}\n", digest, name))
        .with_context(|| format!("Failed to write {}", sum_path.display()))?;
    Ok(sum_path)
}
