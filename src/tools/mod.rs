//! External collaborators.
//!
//! Each external tool sits behind a narrow trait so the pipeline can be run
//! against fakes in tests:
//! - [`RootfsPopulator`] - installs packages into an arbitrary root (`dnf`)
//! - [`Specializer`] - installer-only rootfs customization
//! - [`Archiver`] - compresses the rootfs (`cpio` | `gzip`)
//! - [`RepoBuilder`] - downloads RPMs and indexes them (`dnf download`, `createrepo`)
//! - [`ImageAssembler`] - produces the bootable image (`mkisofs`)

pub mod archive;
pub mod dnf;
pub mod installer;
pub mod iso;
pub mod repo;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::BuildConfig;
use crate::resolve::PackagePlan;

pub use archive::CpioArchiver;
pub use dnf::Dnf;
pub use installer::InstallerSetup;
pub use iso::MkisofsAssembler;
pub use repo::RpmRepoBuilder;

/// Installs a package set into an installation root.
pub trait RootfsPopulator {
    /// Install `packages` into `target_dir`, refreshing the repository file
    /// from `repo_file` first.
    fn install(&self, target_dir: &Path, packages: &[String], repo_file: &Path) -> Result<()>;
}

/// Post-install customization of an installer rootfs.
pub trait Specializer {
    fn specialize(&self, rootfs: &Path, plan: &PackagePlan, repo_file: &Path) -> Result<()>;
}

/// Compresses a directory tree into a single archive.
pub trait Archiver {
    /// Archive `source_dir` into `dest_dir`, returning the archive path.
    fn compress(&self, source_dir: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// Builds an on-media package repository.
pub trait RepoBuilder {
    /// Download `packages` and their dependencies into `dest_dir`, resolving
    /// against the installation root `resolve_root`.
    fn download(&self, dest_dir: &Path, packages: &[String], resolve_root: &Path) -> Result<()>;

    /// Write repository metadata for the packages in `dest_dir`.
    fn index_repository(&self, dest_dir: &Path) -> Result<()>;
}

/// What the image assembler needs.
#[derive(Debug, Clone, Copy)]
pub struct AssembleRequest<'a> {
    /// ISO staging tree; becomes the image root.
    pub staging_dir: &'a Path,
    /// Populated rootfs; must contain `boot/vmlinuz-*`.
    pub rootfs_dir: &'a Path,
    /// Compressed rootfs to ship as the initrd.
    pub archive: &'a Path,
    /// Full path of the image to create.
    pub output: &'a Path,
}

/// Produces the final image file.
pub trait ImageAssembler {
    fn assemble(&self, request: &AssembleRequest<'_>) -> Result<PathBuf>;
}

/// One implementation per collaborator.
pub struct Toolchain {
    pub populator: Box<dyn RootfsPopulator>,
    pub specializer: Box<dyn Specializer>,
    pub archiver: Box<dyn Archiver>,
    pub repo_builder: Box<dyn RepoBuilder>,
    pub assembler: Box<dyn ImageAssembler>,
}

impl Toolchain {
    /// The real host tools, configured from `config`. Package loops stop
    /// once `cancel` trips.
    pub fn host(config: &BuildConfig, cancel: &CancelToken) -> Self {
        let dnf =
            Dnf::new(config.debug, config.release_version.clone()).with_cancel(cancel.clone());
        Self {
            populator: Box::new(dnf.clone()),
            specializer: Box::new(InstallerSetup::new(
                dnf.clone(),
                config.installer_packages.clone(),
            )),
            archiver: Box::new(CpioArchiver::with_level(config.compression_level)),
            repo_builder: Box::new(RpmRepoBuilder::new(dnf, config.debug)),
            assembler: Box::new(MkisofsAssembler::new(
                config.isolinux_dir.clone(),
                config.debug,
            )),
        }
    }
}
