//! omni-imager library.
//!
//! Builds bootable images (live CD ISO, installer ISO, VHD) from a declared
//! package set by driving dnf, cpio/gzip, createrepo and mkisofs through the
//! stage sequence in [`pipeline`].

pub mod build_type;
pub mod cancel;
pub mod checksum;
pub mod config;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod resolve;
pub mod timing;
pub mod tools;
pub mod workspace;

pub use build_type::BuildType;
pub use config::BuildConfig;
pub use error::BuildError;
pub use input::{BuildInputs, PackageList};
pub use pipeline::{BuildReport, Pipeline};
