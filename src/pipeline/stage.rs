//! Stages, states and the per-build-type stage table.

use serde::Serialize;
use std::fmt;

use crate::build_type::BuildType;

/// One unit of work in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PrepareWorkspace,
    PopulateRootfs,
    Specialize,
    Archive,
    BuildRepo,
    Assemble,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PrepareWorkspace => "prepare-workspace",
            Stage::PopulateRootfs => "populate-rootfs",
            Stage::Specialize => "specialize",
            Stage::Archive => "archive",
            Stage::BuildRepo => "build-repo",
            Stage::Assemble => "assemble",
        }
    }

    /// State entered when this stage completes.
    pub fn reached(self) -> PipelineState {
        match self {
            Stage::PrepareWorkspace => PipelineState::WorkspaceReady,
            Stage::PopulateRootfs => PipelineState::RootfsPopulated,
            Stage::Specialize => PipelineState::Specialized,
            Stage::Archive => PipelineState::Archived,
            Stage::BuildRepo => PipelineState::RepoBuilt,
            Stage::Assemble => PipelineState::Assembled,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run is. `Assembled` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum PipelineState {
    Validated,
    WorkspaceReady,
    RootfsPopulated,
    Specialized,
    Archived,
    RepoBuilt,
    Assembled,
    Failed { stage: Stage, message: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Assembled | PipelineState::Failed { .. })
    }
}

const VHD_STAGES: &[Stage] = &[Stage::PopulateRootfs, Stage::Archive, Stage::Assemble];
const LIVECD_STAGES: &[Stage] = &[Stage::PopulateRootfs, Stage::Archive, Stage::Assemble];
const INSTALLER_STAGES: &[Stage] = &[
    Stage::PopulateRootfs,
    Stage::Specialize,
    Stage::Archive,
    Stage::BuildRepo,
    Stage::Assemble,
];

/// Stages run after the workspace is prepared, in order.
pub fn stage_plan(build_type: BuildType) -> &'static [Stage] {
    match build_type {
        BuildType::Vhd => VHD_STAGES,
        BuildType::LivecdIso => LIVECD_STAGES,
        BuildType::InstallerIso => INSTALLER_STAGES,
    }
}
