//! `build-report.json`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build_type::BuildType;

use super::stage::{PipelineState, Stage};

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub seconds: f64,
}

/// What happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub build_type: BuildType,
    pub output: PathBuf,
    pub checksum: Option<PathBuf>,
    /// Every state entered, in order, ending with the terminal one.
    pub states: Vec<PipelineState>,
    pub stages: Vec<StageTiming>,
    pub elapsed_secs: f64,
    pub final_state: PipelineState,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == PipelineState::Assembled
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write build report {}", path.display()))
    }
}

/// Accumulates states and timings while the pipeline runs.
#[derive(Debug)]
pub(crate) struct RunRecord {
    build_type: BuildType,
    output: PathBuf,
    checksum: Option<PathBuf>,
    states: Vec<PipelineState>,
    stages: Vec<StageTiming>,
    cancelled: bool,
}

impl RunRecord {
    pub(crate) fn new(build_type: BuildType, output: PathBuf) -> Self {
        Self {
            build_type,
            output,
            checksum: None,
            states: vec![PipelineState::Validated],
            stages: Vec::new(),
            cancelled: false,
        }
    }

    pub(crate) fn completed(&mut self, stage: Stage, took: Duration) {
        self.stages.push(StageTiming {
            stage,
            seconds: took.as_secs_f64(),
        });
        self.states.push(stage.reached());
    }

    pub(crate) fn set_checksum(&mut self, path: PathBuf) {
        self.checksum = Some(path);
    }

    pub(crate) fn set_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Close the record with its terminal state.
    pub(crate) fn finish(
        mut self,
        elapsed: Duration,
        failure: Option<(Stage, String)>,
    ) -> BuildReport {
        let final_state = match &failure {
            Some((stage, message)) => PipelineState::Failed {
                stage: *stage,
                message: message.clone(),
            },
            None => PipelineState::Assembled,
        };
        if self.states.last() != Some(&final_state) {
            self.states.push(final_state.clone());
        }

        let (failed_stage, error) = match failure {
            Some((stage, message)) => (Some(stage), Some(message)),
            None => (None, None),
        };

        BuildReport {
            build_type: self.build_type,
            output: self.output,
            checksum: self.checksum,
            states: self.states,
            stages: self.stages,
            elapsed_secs: elapsed.as_secs_f64(),
            final_state,
            failed_stage,
            error,
            cancelled: self.cancelled,
        }
    }
}
