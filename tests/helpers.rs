//! Shared test utilities for omni-imager tests.
#![allow(dead_code)]

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

use omni_imager::cancel::CancelToken;
use omni_imager::config::ISOLINUX_FILES;
use omni_imager::input::{BuildInputs, DEFAULT_OUTPUT_FILE};
use omni_imager::pipeline::Stage;
use omni_imager::resolve::PackagePlan;
use omni_imager::tools::{
    Archiver, AssembleRequest, ImageAssembler, RepoBuilder, RootfsPopulator, Specializer,
    Toolchain,
};
use omni_imager::workspace::ARCHIVE_NAME;

/// Test environment: descriptors, repo file and isolinux files in a temp dir.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub working_dir: PathBuf,
    pub repo_file: PathBuf,
    pub isolinux_dir: PathBuf,
    pub config_file: PathBuf,
    pub package_list: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let working_dir = base.join("work");
        let repo_file = base.join("openEuler.repo");
        fs::write(
            &repo_file,
            "[everything]\nname=everything\nbaseurl=http://repo.example/everything/\n",
        )
        .expect("Failed to write repo file");

        let isolinux_dir = base.join("isolinux");
        fs::create_dir_all(&isolinux_dir).expect("Failed to create isolinux dir");
        for name in ISOLINUX_FILES {
            fs::write(isolinux_dir.join(name), name).expect("Failed to write isolinux file");
        }

        let config_file = base.join("config.yaml");
        fs::write(
            &config_file,
            format!(
                "working_dir: {}\ndebug: false\nrepo_file: {}\nisolinux_dir: {}\n",
                working_dir.display(),
                repo_file.display(),
                isolinux_dir.display()
            ),
        )
        .expect("Failed to write config");

        let package_list = base.join("packages.json");

        Self {
            _temp_dir: temp_dir,
            working_dir,
            repo_file,
            isolinux_dir,
            config_file,
            package_list,
        }
    }

    pub fn write_packages(&self, packages: &[&str]) {
        let json = serde_json::json!({ "packages": packages });
        fs::write(&self.package_list, json.to_string()).expect("Failed to write package list");
    }

    pub fn inputs(&self, build_type: &str) -> BuildInputs {
        self.inputs_with_output(build_type, DEFAULT_OUTPUT_FILE)
    }

    pub fn inputs_with_output(&self, build_type: &str, output: &str) -> BuildInputs {
        BuildInputs::load(&self.package_list, &self.config_file, build_type, output)
            .expect("inputs should load")
    }

    pub fn rootfs(&self) -> PathBuf {
        self.working_dir.join("rootfs")
    }

    /// Leave a file behind as if from an earlier run.
    pub fn plant_stale_file(&self) -> PathBuf {
        fs::create_dir_all(&self.working_dir).expect("Failed to create working dir");
        let stale = self.working_dir.join("stale.txt");
        fs::write(&stale, "left over").expect("Failed to write stale file");
        stale
    }
}

/// One collaborator invocation, as seen by the fakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Install {
        target: PathBuf,
        packages: Vec<String>,
    },
    Specialize {
        rootfs: PathBuf,
        extra: Vec<String>,
        auto_login: bool,
    },
    Compress {
        source: PathBuf,
        dest: PathBuf,
    },
    Download {
        dest: PathBuf,
        packages: Vec<String>,
        resolve_root: PathBuf,
    },
    Index {
        dest: PathBuf,
    },
    Assemble {
        staging: PathBuf,
        rootfs: PathBuf,
        output: PathBuf,
    },
}

impl Call {
    pub fn stage(&self) -> Stage {
        match self {
            Call::Install { .. } => Stage::PopulateRootfs,
            Call::Specialize { .. } => Stage::Specialize,
            Call::Compress { .. } => Stage::Archive,
            Call::Download { .. } | Call::Index { .. } => Stage::BuildRepo,
            Call::Assemble { .. } => Stage::Assemble,
        }
    }
}

/// Shared record of every fake call, in order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self.calls().iter().map(Call::stage).collect();
        stages.dedup();
        stages
    }
}

/// Per-stage behavior shared by every fake.
#[derive(Clone)]
struct Behavior {
    log: CallLog,
    fail: Option<Stage>,
    cancel: Option<(Stage, CancelToken)>,
    /// Stop like the dnf loops do once the token trips.
    honor_cancel: bool,
}

impl Behavior {
    fn enter(&self, stage: Stage) -> Result<()> {
        if let Some((at, token)) = &self.cancel {
            if *at == stage {
                token.cancel();
                if self.honor_cancel {
                    token.check()?;
                }
            }
        }
        if self.fail == Some(stage) {
            bail!("simulated {} failure", stage);
        }
        Ok(())
    }
}

struct FakePopulator(Behavior);

impl RootfsPopulator for FakePopulator {
    fn install(&self, target_dir: &Path, packages: &[String], _repo_file: &Path) -> Result<()> {
        self.0.log.push(Call::Install {
            target: target_dir.to_path_buf(),
            packages: packages.to_vec(),
        });
        self.0.enter(Stage::PopulateRootfs)?;
        fs::create_dir_all(target_dir.join("boot"))?;
        fs::write(target_dir.join("boot/vmlinuz-5.10.0-136.oe2203.x86_64"), "kernel")?;
        fs::write(target_dir.join("installed.txt"), packages.join("\n"))?;
        Ok(())
    }
}

struct FakeSpecializer(Behavior);

impl Specializer for FakeSpecializer {
    fn specialize(&self, rootfs: &Path, plan: &PackagePlan, _repo_file: &Path) -> Result<()> {
        self.0.log.push(Call::Specialize {
            rootfs: rootfs.to_path_buf(),
            extra: plan.extra.clone(),
            auto_login: plan.auto_login,
        });
        self.0.enter(Stage::Specialize)
    }
}

struct FakeArchiver(Behavior);

impl Archiver for FakeArchiver {
    fn compress(&self, source_dir: &Path, dest_dir: &Path) -> Result<PathBuf> {
        self.0.log.push(Call::Compress {
            source: source_dir.to_path_buf(),
            dest: dest_dir.to_path_buf(),
        });
        self.0.enter(Stage::Archive)?;
        let archive = dest_dir.join(ARCHIVE_NAME);
        fs::write(&archive, "archive")?;
        Ok(archive)
    }
}

struct FakeRepoBuilder(Behavior);

impl RepoBuilder for FakeRepoBuilder {
    fn download(&self, dest_dir: &Path, packages: &[String], resolve_root: &Path) -> Result<()> {
        self.0.log.push(Call::Download {
            dest: dest_dir.to_path_buf(),
            packages: packages.to_vec(),
            resolve_root: resolve_root.to_path_buf(),
        });
        self.0.enter(Stage::BuildRepo)?;
        fs::create_dir_all(dest_dir)?;
        for package in packages {
            fs::write(dest_dir.join(format!("{}.rpm", package)), package)?;
        }
        Ok(())
    }

    fn index_repository(&self, dest_dir: &Path) -> Result<()> {
        self.0.log.push(Call::Index {
            dest: dest_dir.to_path_buf(),
        });
        fs::create_dir_all(dest_dir.join("repodata"))?;
        fs::write(dest_dir.join("repodata/repomd.xml"), "<repomd/>")?;
        Ok(())
    }
}

struct FakeAssembler(Behavior);

impl ImageAssembler for FakeAssembler {
    fn assemble(&self, request: &AssembleRequest<'_>) -> Result<PathBuf> {
        self.0.log.push(Call::Assemble {
            staging: request.staging_dir.to_path_buf(),
            rootfs: request.rootfs_dir.to_path_buf(),
            output: request.output.to_path_buf(),
        });
        self.0.enter(Stage::Assemble)?;
        if !request.archive.is_file() {
            bail!("archive {} missing", request.archive.display());
        }
        fs::write(request.output, "bootable image")?;
        Ok(request.output.to_path_buf())
    }
}

/// Builder for a [`Toolchain`] made of recording fakes.
pub struct FakeTools {
    behavior: Behavior,
}

impl FakeTools {
    pub fn new(log: &CallLog) -> Self {
        Self {
            behavior: Behavior {
                log: log.clone(),
                fail: None,
                cancel: None,
                honor_cancel: false,
            },
        }
    }

    /// Make the collaborator for `stage` return an error.
    pub fn failing(mut self, stage: Stage) -> Self {
        self.behavior.fail = Some(stage);
        self
    }

    /// Trip `token` when `stage` starts, as a SIGINT would.
    pub fn cancelling(mut self, stage: Stage, token: &CancelToken) -> Self {
        self.behavior.cancel = Some((stage, token.clone()));
        self
    }

    /// Trip `token` when `stage` starts and have that collaborator give up
    /// with `Interrupted`, as SIGTERM during a package loop would.
    pub fn interrupting(mut self, stage: Stage, token: &CancelToken) -> Self {
        self.behavior.cancel = Some((stage, token.clone()));
        self.behavior.honor_cancel = true;
        self
    }

    pub fn build(self) -> Toolchain {
        let b = self.behavior;
        Toolchain {
            populator: Box::new(FakePopulator(b.clone())),
            specializer: Box::new(FakeSpecializer(b.clone())),
            archiver: Box::new(FakeArchiver(b.clone())),
            repo_builder: Box::new(FakeRepoBuilder(b.clone())),
            assembler: Box::new(FakeAssembler(b)),
        }
    }
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file at {}", path.display());
}

/// Assert that a file contains a string.
pub fn assert_file_contains(path: &Path, needle: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    assert!(
        content.contains(needle),
        "Expected {} to contain {:?}, got:\n{}",
        path.display(),
        needle,
        content
    );
}

/// Parse `build-report.json` from the working directory.
pub fn read_report(working_dir: &Path) -> serde_json::Value {
    let path = working_dir.join("build-report.json");
    let text = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    serde_json::from_str(&text).expect("report is valid JSON")
}
