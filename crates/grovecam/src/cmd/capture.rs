use std::time::Instant;

use grovecam::store::{DirectoryStore, ImageStore};
use grovecam_protocol::{Camera, CancelFlag};
use serde::Serialize;
use tracing::info;

use crate::cmd::CaptureArgs;
use crate::exit::{camera_error, store_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct CaptureOutput {
    port: String,
    path: String,
    bytes: usize,
    packages: u32,
    checksum_retries: u32,
    sync_attempts: u32,
    package_size: u16,
    termination: String,
    elapsed_ms: u128,
}

pub fn run(args: CaptureArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session_config()?;
    let package_size = config.retrieval.package_size.get();
    let termination = config.retrieval.termination.to_string();

    let cancel = CancelFlag::new();
    install_ctrlc_handler(cancel.clone())?;

    let started = Instant::now();
    let mut camera = Camera::open(&args.link.port, config)
        .map_err(|err| camera_error("connect failed", err))?
        .with_cancel_flag(cancel);
    let sync_attempts = camera.handshake_outcome().sync_attempts;

    let captured = camera.capture();
    let _ = camera.close();
    let image = captured.map_err(|err| camera_error("capture failed", err))?;

    let path = DirectoryStore::new(&args.output_dir)
        .save(&image.data, &args.name)
        .map_err(|err| store_error("save failed", err))?;
    info!(path = %path.display(), "capture complete");

    let out = CaptureOutput {
        port: args.link.port.clone(),
        path: path.display().to_string(),
        bytes: image.data.len(),
        packages: image.packages,
        checksum_retries: image.checksum_retries,
        sync_attempts,
        package_size,
        termination,
        elapsed_ms: started.elapsed().as_millis(),
    };
    let rows = [
        ("path", out.path.clone()),
        ("bytes", out.bytes.to_string()),
        ("packages", out.packages.to_string()),
        ("checksum_retries", out.checksum_retries.to_string()),
        ("sync_attempts", out.sync_attempts.to_string()),
        ("elapsed_ms", out.elapsed_ms.to_string()),
    ];
    print_record(&out, &rows, format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(cancel: CancelFlag) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
