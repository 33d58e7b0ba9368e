//! Supported image types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::InputError;

/// The kind of image a run produces. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildType {
    /// Virtual disk image.
    Vhd,
    /// Minimal bootable installer carrying the requested packages as a repository.
    InstallerIso,
    /// Live system image.
    LivecdIso,
}

impl BuildType {
    pub const ALL: [BuildType; 3] = [BuildType::Vhd, BuildType::InstallerIso, BuildType::LivecdIso];

    /// Command-line token for this build type.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::Vhd => "vhd",
            BuildType::InstallerIso => "installer-iso",
            BuildType::LivecdIso => "livecd-iso",
        }
    }

    pub fn is_installer(self) -> bool {
        matches!(self, BuildType::InstallerIso)
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| InputError::UnsupportedBuildType(s.to_string()))
    }
}
