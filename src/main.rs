//! omni-imager - builds bootable openEuler images from a package list.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use omni_imager::cancel::CancelToken;
use omni_imager::input::{BuildInputs, DEFAULT_OUTPUT_FILE};
use omni_imager::timing::format_duration;
use omni_imager::tools::Toolchain;
use omni_imager::Pipeline;

#[derive(Parser)]
#[command(name = "omni-imager", version)]
#[command(about = "Build live CD, installer ISO and VHD images from a package list")]
#[command(
    after_help = "BUILD TYPES:\n  vhd            Virtual disk image\n  installer-iso  Minimal installer carrying the packages as a repository\n  livecd-iso     Live system with the packages installed"
)]
struct Cli {
    /// JSON file with a "packages" list
    #[arg(long)]
    package_list: PathBuf,

    /// YAML build configuration (working_dir, debug, ...)
    #[arg(long)]
    config_file: PathBuf,

    /// One of: vhd, installer-iso, livecd-iso
    #[arg(long)]
    build_type: String,

    /// Image file name, created inside working_dir
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    output_file: String,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Load .env if present
    dotenvy::dotenv().ok();

    let inputs = match BuildInputs::load(
        &cli.package_list,
        &cli.config_file,
        &cli.build_type,
        &cli.output_file,
    ) {
        Ok(inputs) => inputs,
        Err(e) => {
            init_logging(false);
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(inputs.config.debug);

    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_signal_handler() {
        log::warn!("Cannot install interrupt handler: {}", e);
    }

    let toolchain = Toolchain::host(&inputs.config, &cancel);
    match Pipeline::new(&inputs, &toolchain).with_cancel(cancel).run() {
        Ok(report) => {
            println!();
            println!("=== Build Complete ===");
            println!("  Image: {}", report.output.display());
            if let Some(ref sum) = report.checksum {
                println!("  Checksum: {}", sum.display());
            }
            println!(
                "  Time: {}",
                format_duration(std::time::Duration::from_secs_f64(report.elapsed_secs))
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `info` by default, `debug` when the configuration asks for it.
/// `RUST_LOG` wins when set.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}
