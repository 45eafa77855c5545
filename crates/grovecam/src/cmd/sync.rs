use grovecam_protocol::Camera;
use serde::Serialize;

use crate::cmd::SyncArgs;
use crate::exit::{camera_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct SyncOutput {
    port: String,
    baud: u32,
    sync_attempts: u32,
    discarded_bytes: usize,
    ready: bool,
}

pub fn run(args: SyncArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.link.session_config()?;
    let baud = config.baud;

    let mut camera =
        Camera::open(&args.link.port, config).map_err(|err| camera_error("sync failed", err))?;
    let outcome = camera.handshake_outcome();
    let _ = camera.close();

    let out = SyncOutput {
        port: args.link.port,
        baud,
        sync_attempts: outcome.sync_attempts,
        discarded_bytes: outcome.discarded_bytes,
        ready: true,
    };
    let rows = [
        ("port", out.port.clone()),
        ("baud", out.baud.to_string()),
        ("sync_attempts", out.sync_attempts.to_string()),
        ("discarded_bytes", out.discarded_bytes.to_string()),
    ];
    print_record(&out, &rows, format);
    Ok(SUCCESS)
}
