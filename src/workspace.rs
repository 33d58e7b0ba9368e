//! Workspace lifecycle.
//!
//! Layout under `working_dir`:
//!
//! ```text
//! <working_dir>/
//! ├── rootfs/
//! │   └── etc/yum.repos.d/<repo file>
//! ├── iso/                 # ISO staging (isolinux, vmlinuz, initrd.img, RPMS/)
//! ├── initrd.img           # compressed rootfs
//! ├── build-report.json
//! └── <output image>
//! ```
//!
//! The tree is deleted and rebuilt on every run. Anything placed there by
//! hand is lost.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::BuildConfig;
use crate::error::WorkspaceError;

pub const ROOTFS_DIR: &str = "rootfs";
/// Repository configuration directory, relative to a rootfs.
pub const REPO_CONFIG_DIR: &str = "etc/yum.repos.d";
pub const ISO_DIR: &str = "iso";
/// Installer package repository, relative to the ISO staging directory.
pub const RPMS_DIR: &str = "RPMS";
pub const ARCHIVE_NAME: &str = "initrd.img";
pub const REPORT_NAME: &str = "build-report.json";

/// Paths of one run's workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub rootfs: PathBuf,
    pub repo_config_dir: PathBuf,
    pub iso_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Derive the layout for `root` without touching the filesystem.
    pub fn for_root(root: &Path) -> Self {
        let rootfs = root.join(ROOTFS_DIR);
        Self {
            root: root.to_path_buf(),
            repo_config_dir: rootfs.join(REPO_CONFIG_DIR),
            rootfs,
            iso_dir: root.join(ISO_DIR),
        }
    }

    pub fn rpms_dir(&self) -> PathBuf {
        self.iso_dir.join(RPMS_DIR)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_NAME)
    }
}

/// Wipe `config.working_dir` and build a fresh layout with the repository
/// file in place.
///
/// Any failing sub-step fails the whole preparation.
pub fn prepare(config: &BuildConfig) -> Result<WorkspaceLayout, WorkspaceError> {
    let layout = WorkspaceLayout::for_root(&config.working_dir);

    log::info!("Preparing clean workspace at {}", layout.root.display());
    teardown(&layout.root)?;

    fs::create_dir_all(&layout.root)
        .map_err(|e| WorkspaceError::new("create", &layout.root, e))?;
    fs::create_dir_all(&layout.repo_config_dir)
        .map_err(|e| WorkspaceError::new("create", &layout.repo_config_dir, e))?;
    install_repo_file(&layout.rootfs, &config.repo_file)
        .map_err(|e| WorkspaceError::new("copy repository file into", &layout.repo_config_dir, e))?;
    fs::create_dir(&layout.iso_dir)
        .map_err(|e| WorkspaceError::new("create", &layout.iso_dir, e))?;

    Ok(layout)
}

/// Recursively delete `path`. A missing path is not an error.
pub fn teardown(path: &Path) -> Result<(), WorkspaceError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WorkspaceError::new("remove", path, e)),
    }
}

/// Copy `repo_file` into the repository configuration directory of
/// `rootfs`, creating it if needed. Returns the installed path.
///
/// Package installs can replace `/etc` content, so this is repeated right
/// before every install into the rootfs.
pub fn install_repo_file(rootfs: &Path, repo_file: &Path) -> io::Result<PathBuf> {
    let file_name = repo_file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", repo_file.display()),
        )
    })?;
    let repo_dir = rootfs.join(REPO_CONFIG_DIR);
    fs::create_dir_all(&repo_dir)?;
    let dest = repo_dir.join(file_name);
    fs::copy(repo_file, &dest)?;
    Ok(dest)
}
