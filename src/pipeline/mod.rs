//! Build orchestration.
//!
//! ```text
//! Validated -> WorkspaceReady -> RootfsPopulated -> [Specialized] -> Archived
//!           -> [RepoBuilt] -> Assembled
//! ```
//!
//! Bracketed states belong to installer builds only; [`stage_plan`] declares
//! each build type's sequence once. The first failure ends the run in
//! `Failed`. Nothing is retried or rolled back: the workspace stays on disk
//! for inspection and the next run wipes it.

mod report;
mod stage;

pub use report::{BuildReport, StageTiming};
pub use stage::{stage_plan, PipelineState, Stage};

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Instant;

use crate::cancel::{CancelToken, Interrupted};
use crate::checksum;
use crate::error::{BuildError, StageError};
use crate::input::BuildInputs;
use crate::preflight::{self, RequiredTool, REQUIRED_TOOLS};
use crate::resolve::{self, PackagePlan};
use crate::timing::{format_duration, Timer};
use crate::tools::{AssembleRequest, Toolchain};
use crate::workspace::{self, WorkspaceLayout};

use report::RunRecord;

/// Outputs carried from one stage to a later one.
#[derive(Debug, Default)]
struct Artifacts {
    archive: Option<PathBuf>,
    checksum: Option<PathBuf>,
}

/// One build run over validated inputs.
pub struct Pipeline<'a> {
    inputs: &'a BuildInputs,
    tools: &'a Toolchain,
    cancel: CancelToken,
    required_tools: &'a [RequiredTool],
}

impl<'a> Pipeline<'a> {
    pub fn new(inputs: &'a BuildInputs, tools: &'a Toolchain) -> Self {
        Self {
            inputs,
            tools,
            cancel: CancelToken::new(),
            required_tools: REQUIRED_TOOLS,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the host tools checked before the workspace is touched.
    pub fn with_required_tools(mut self, tools: &'a [RequiredTool]) -> Self {
        self.required_tools = tools;
        self
    }

    /// Run every stage for the build type, stopping at the first failure.
    ///
    /// Environment and cancellation are checked before the workspace is
    /// wiped. Once it exists, `build-report.json` is written at the terminal
    /// state whatever the outcome.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let config = &self.inputs.config;
        let build_type = self.inputs.build_type;

        preflight::validate_environment(self.required_tools)?;
        config.log();

        let plan = resolve::resolve(build_type, &self.inputs.packages);
        log::info!(
            "Building {} image: {} packages to install, {} for the on-media repository",
            build_type,
            plan.install.len(),
            plan.extra.len()
        );

        if self.cancel.is_cancelled() {
            return Err(StageError::new(Stage::PrepareWorkspace, interrupted()).into());
        }

        let mut record = RunRecord::new(build_type, self.inputs.output_path());
        let timer = Timer::start(Stage::PrepareWorkspace.as_str());
        let layout = workspace::prepare(config)?;
        record.completed(Stage::PrepareWorkspace, timer.finish());

        let mut artifacts = Artifacts::default();
        let mut failure = None;

        for &stage in stage_plan(build_type) {
            if self.cancel.is_cancelled() {
                record.set_cancelled();
                failure = Some(StageError::new(stage, interrupted()));
                break;
            }

            log::info!("==> {}", stage);
            let timer = Timer::start(stage.as_str());
            match self.execute(stage, &layout, &plan, &mut artifacts) {
                Ok(()) => record.completed(stage, timer.finish()),
                Err(cause) => {
                    let cause = if self.cancel.is_cancelled() {
                        record.set_cancelled();
                        if cause.is::<Interrupted>() {
                            cause
                        } else {
                            cause.context(Interrupted)
                        }
                    } else {
                        cause
                    };
                    failure = Some(StageError::new(stage, cause));
                    break;
                }
            }
        }

        if let Some(path) = artifacts.checksum {
            record.set_checksum(path);
        }

        let elapsed = start.elapsed();
        let report = record.finish(
            elapsed,
            failure.as_ref().map(|e| (e.stage, format!("{:#}", e.cause))),
        );
        if let Err(e) = report.write(&layout.report_path()) {
            log::warn!("{:#}", e);
        }

        match failure {
            Some(err) => {
                log::error!("Build failed after {}: {}", format_duration(elapsed), err);
                Err(err.into())
            }
            None => {
                log::info!("Build finished in {}", format_duration(elapsed));
                Ok(report)
            }
        }
    }

    fn execute(
        &self,
        stage: Stage,
        layout: &WorkspaceLayout,
        plan: &PackagePlan,
        artifacts: &mut Artifacts,
    ) -> Result<()> {
        let config = &self.inputs.config;
        match stage {
            Stage::PrepareWorkspace => {
                bail!("the workspace is prepared before the stage plan runs");
            }
            Stage::PopulateRootfs => {
                self.tools
                    .populator
                    .install(&layout.rootfs, &plan.install, &config.repo_file)?;
            }
            Stage::Specialize => {
                self.tools
                    .specializer
                    .specialize(&layout.rootfs, plan, &config.repo_file)?;
            }
            Stage::Archive => {
                let archive = self.tools.archiver.compress(&layout.rootfs, &layout.root)?;
                artifacts.archive = Some(archive);
            }
            Stage::BuildRepo => {
                let rpms = layout.rpms_dir();
                self.tools
                    .repo_builder
                    .download(&rpms, &plan.extra, &layout.rootfs)?;
                self.tools.repo_builder.index_repository(&rpms)?;
            }
            Stage::Assemble => {
                let archive = artifacts
                    .archive
                    .as_deref()
                    .context("no rootfs archive to assemble")?;
                let output = self.inputs.output_path();
                let image = self.tools.assembler.assemble(&AssembleRequest {
                    staging_dir: &layout.iso_dir,
                    rootfs_dir: &layout.rootfs,
                    archive,
                    output: &output,
                })?;
                let sum = checksum::write_checksum(&image)?;
                log::info!("  Checksum: {}", sum.display());
                artifacts.checksum = Some(sum);
            }
        }
        Ok(())
    }
}

fn interrupted() -> anyhow::Error {
    anyhow::Error::new(Interrupted)
}
