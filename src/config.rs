//! Build configuration descriptor.
//!
//! Reads a YAML mapping (JSON works too) with at least `working_dir`.
//! Optional keys fall back to environment variables (which may come from a
//! `.env` file loaded at startup), then to built-in defaults. Unknown keys
//! are ignored.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::input::is_valid_package_name;

/// Repository configuration copied into every rootfs.
pub const DEFAULT_REPO_FILE: &str = "/etc/omni-imager/openEuler.repo";

/// Directory holding the isolinux boot files.
pub const DEFAULT_ISOLINUX_DIR: &str = "/etc/omni-imager/isolinux";

/// Files the image assembler stages from the isolinux directory.
pub const ISOLINUX_FILES: [&str; 3] = ["isolinux.bin", "isolinux.cfg", "ldlinux.c32"];

/// gzip level used for the rootfs archive unless the descriptor sets one.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

pub const REPO_FILE_ENV: &str = "OMNI_IMAGER_REPO_FILE";
pub const ISOLINUX_DIR_ENV: &str = "OMNI_IMAGER_ISOLINUX_DIR";

/// Tooling installed into an installer rootfs on top of the base system.
pub const INSTALLER_TOOL_PACKAGES: &[&str] = &[
    "dnf",
    "dnf-plugins-core",
    "parted",
    "dosfstools",
    "createrepo_c",
];

/// Descriptor as written on disk. Every field is optional here so that a
/// missing key becomes a precise [`InputError::MissingField`].
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    working_dir: Option<PathBuf>,
    debug: Option<bool>,
    repo_file: Option<PathBuf>,
    isolinux_dir: Option<PathBuf>,
    release_version: Option<String>,
    installer_packages: Option<Vec<String>>,
    compression_level: Option<u32>,
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    /// Root of the disposable workspace. Wiped at the start of every run.
    pub working_dir: PathBuf,
    /// Verbose logging and unquieted external tools.
    pub debug: bool,
    /// Repository configuration file copied into the rootfs.
    pub repo_file: PathBuf,
    /// Source of `isolinux.bin`, `isolinux.cfg` and `ldlinux.c32`.
    pub isolinux_dir: PathBuf,
    /// Passed to dnf as `--releasever` when set.
    pub release_version: Option<String>,
    /// Extra tooling for installer images.
    pub installer_packages: Vec<String>,
    /// gzip level (1-9) for the rootfs archive.
    pub compression_level: u32,
}

impl BuildConfig {
    /// Read and validate a configuration descriptor.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Parse descriptor text. `origin` is used for messages and to resolve
    /// relative `repo_file` / `isolinux_dir` values.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self, InputError> {
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| InputError::Malformed {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?
        };

        let base_dir = origin.parent().unwrap_or(Path::new("."));
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base_dir.join(p) };

        let working_dir = raw.working_dir.ok_or_else(|| InputError::MissingField {
            path: origin.to_path_buf(),
            field: "working_dir",
        })?;

        let repo_file = raw
            .repo_file
            .map(resolve)
            .or_else(|| env_path(REPO_FILE_ENV))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPO_FILE));

        let isolinux_dir = raw
            .isolinux_dir
            .map(resolve)
            .or_else(|| env_path(ISOLINUX_DIR_ENV))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ISOLINUX_DIR));

        let installer_packages = raw.installer_packages.unwrap_or_else(|| {
            INSTALLER_TOOL_PACKAGES
                .iter()
                .map(|p| p.to_string())
                .collect()
        });

        let config = Self {
            working_dir,
            debug: raw.debug.unwrap_or(false),
            repo_file,
            isolinux_dir,
            release_version: raw.release_version.filter(|v| !v.trim().is_empty()),
            installer_packages,
            compression_level: raw.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), InputError> {
        if !self.working_dir.is_absolute() {
            return Err(InputError::InvalidConfig(format!(
                "working_dir must be an absolute path, got {}",
                self.working_dir.display()
            )));
        }
        // The workspace is deleted unconditionally; never let that be `/`,
        // however it is spelled.
        if self
            .working_dir
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(InputError::InvalidConfig(format!(
                "working_dir must not contain `..`, got {}",
                self.working_dir.display()
            )));
        }
        if self.working_dir.parent().is_none() {
            return Err(InputError::InvalidConfig(
                "working_dir must not be the filesystem root".to_string(),
            ));
        }

        if !self.repo_file.is_file() {
            return Err(InputError::InvalidConfig(format!(
                "repository file not found: {} (set repo_file or {})",
                self.repo_file.display(),
                REPO_FILE_ENV
            )));
        }

        let missing: Vec<_> = self
            .isolinux_files()
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(InputError::InvalidConfig(format!(
                "isolinux files not found: {} (set isolinux_dir or {})",
                missing.join(", "),
                ISOLINUX_DIR_ENV
            )));
        }

        if !(1..=9).contains(&self.compression_level) {
            return Err(InputError::InvalidConfig(format!(
                "compression_level must be between 1 and 9, got {}",
                self.compression_level
            )));
        }

        if let Some(bad) = self
            .installer_packages
            .iter()
            .find(|p| !is_valid_package_name(p))
        {
            return Err(InputError::InvalidConfig(format!(
                "invalid installer package name {:?}",
                bad
            )));
        }

        Ok(())
    }

    /// Full paths of the bootloader staging files.
    pub fn isolinux_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        ISOLINUX_FILES.iter().map(|f| self.isolinux_dir.join(f))
    }

    /// Log configuration at debug level.
    pub fn log(&self) {
        log::debug!("Configuration:");
        log::debug!("  working_dir: {}", self.working_dir.display());
        log::debug!("  debug: {}", self.debug);
        log::debug!("  repo_file: {}", self.repo_file.display());
        log::debug!("  isolinux_dir: {}", self.isolinux_dir.display());
        if let Some(ref v) = self.release_version {
            log::debug!("  release_version: {}", v);
        }
        log::debug!("  installer_packages: {}", self.installer_packages.join(" "));
        log::debug!("  compression_level: {}", self.compression_level);
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
