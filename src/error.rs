//! Error taxonomy for an image build.
//!
//! Four kinds, all unrecoverable at the point of detection:
//! - [`InputError`] - bad or missing descriptor, bad CLI value
//! - [`EnvironmentError`] - required host tools missing
//! - [`WorkspaceError`] - the working tree could not be prepared
//! - [`StageError`] - an external collaborator failed (or the run was interrupted)
//!
//! `InputError` and `EnvironmentError` are always raised before the workspace
//! is touched.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// A descriptor or command-line value could not be accepted.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed descriptor {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("descriptor {} is missing required field '{field}'", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("package list {} is empty", path.display())]
    EmptyPackageList { path: PathBuf },

    #[error("invalid package name {name:?} in {}", path.display())]
    InvalidPackageName { path: PathBuf, name: String },

    #[error("unsupported build type '{0}' (expected one of: vhd, installer-iso, livecd-iso)")]
    UnsupportedBuildType(String),

    #[error("invalid output file name {0:?}: must be a bare file name")]
    InvalidOutputName(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// One or more required host tools are not on the search path.
#[derive(Debug, Error)]
#[error("required binaries not found: {}", missing.join(", "))]
pub struct EnvironmentError {
    pub missing: Vec<String>,
}

/// The working directory tree could not be (re)created.
#[derive(Debug, Error)]
#[error("workspace: failed to {action} {}: {source}", path.display())]
pub struct WorkspaceError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl WorkspaceError {
    pub(crate) fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A pipeline stage did not complete.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {cause:#}")]
pub struct StageError {
    pub stage: Stage,
    pub cause: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, cause: anyhow::Error) -> Self {
        Self { stage, cause }
    }
}

/// Any failure that ends a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Stage(#[from] StageError),
}
