use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use grovecam_frame::PackageSize;
use grovecam_protocol::{
    SessionConfig, Termination, DEFAULT_BAUD, DEFAULT_MAX_PACKAGE_RETRIES, DEFAULT_SYNC_RETRIES,
};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod capture;
pub mod ports;
pub mod sync;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Take a picture and save it as a JPEG file.
    Capture(CaptureArgs),
    /// Synchronize with the camera and report how many attempts it took.
    Sync(SyncArgs),
    /// List serial ports on this host.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Capture(args) => capture::run(args, format),
        Command::Sync(args) => sync::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial link and handshake options shared by commands that talk to the
/// camera.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device the camera is attached to.
    #[arg(env = "GROVECAM_PORT")]
    pub port: String,
    /// Baud rate.
    #[arg(long, env = "GROVECAM_BAUD", default_value_t = DEFAULT_BAUD)]
    pub baud: u32,
    /// SYNC frames to send before giving up.
    #[arg(long, default_value_t = DEFAULT_SYNC_RETRIES)]
    pub sync_retries: u32,
    /// Deadline for each read from the camera (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub read_timeout: String,
}

impl LinkArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = SessionConfig::default();
        config.baud = self.baud;
        config.handshake.sync_retries = self.sync_retries;
        config.options.read_timeout = parse_read_timeout(&self.read_timeout)?;
        config
            .validate()
            .map_err(|err| CliError::new(USAGE, err.to_string()))?;
        Ok(config)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TerminationArg {
    /// Stop after ceil(length / payload) packages.
    Counted,
    /// Stop when the picture ends with the JPEG end marker.
    Marker,
}

impl From<TerminationArg> for Termination {
    fn from(arg: TerminationArg) -> Self {
        match arg {
            TerminationArg::Counted => Termination::Counted,
            TerminationArg::Marker => Termination::Marker,
        }
    }
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Bytes per image package, 16 to 2048.
    #[arg(long, default_value_t = 512)]
    pub package_size: u16,
    /// How the end of the picture is detected.
    #[arg(long, value_enum, default_value = "marker")]
    pub termination: TerminationArg,
    /// Re-requests allowed per package after a checksum failure.
    #[arg(long, default_value_t = DEFAULT_MAX_PACKAGE_RETRIES)]
    pub max_package_retries: u32,
    /// Directory to save pictures in. Created if missing.
    #[arg(long, value_name = "DIR", default_value = grovecam::store::DEFAULT_DIRECTORY)]
    pub output_dir: PathBuf,
    /// File name prefix; a timestamp and `.jpg` are appended.
    #[arg(long, default_value = grovecam::store::DEFAULT_PREFIX)]
    pub name: String,
}

impl CaptureArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = self.link.session_config()?;
        config.retrieval.package_size = PackageSize::new(self.package_size)
            .map_err(|err| CliError::new(USAGE, err.to_string()))?;
        config.retrieval.termination = self.termination.into();
        config.retrieval.max_package_retries = self.max_package_retries;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Shortest read deadline accepted. A 6-byte frame takes about 6 ms on
/// the wire at 9600 baud.
pub const MIN_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Longest read deadline accepted.
pub const MAX_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Parse a read deadline such as `500ms`, `2s` or a bare number of seconds,
/// bounded by [`MIN_READ_TIMEOUT`] and [`MAX_READ_TIMEOUT`].
pub fn parse_read_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid read timeout: {input:?}")))?;
    let timeout = match unit {
        "ms" => Duration::from_millis(value),
        "s" | "" => Duration::from_secs(value),
        other => {
            return Err(CliError::new(
                USAGE,
                format!("unknown read timeout unit {other:?} (use ms or s)"),
            ))
        }
    };

    if !(MIN_READ_TIMEOUT..=MAX_READ_TIMEOUT).contains(&timeout) {
        return Err(CliError::new(
            USAGE,
            format!(
                "read timeout {input} is outside {}ms..={}s",
                MIN_READ_TIMEOUT.as_millis(),
                MAX_READ_TIMEOUT.as_secs()
            ),
        ));
    }
    Ok(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(port: &str) -> LinkArgs {
        LinkArgs {
            port: port.to_string(),
            baud: DEFAULT_BAUD,
            sync_retries: DEFAULT_SYNC_RETRIES,
            read_timeout: "2s".to_string(),
        }
    }

    #[test]
    fn read_timeout_accepts_units() {
        assert_eq!(parse_read_timeout("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(
            parse_read_timeout(" 150ms ").unwrap(),
            Duration::from_millis(150)
        );
        assert_eq!(parse_read_timeout("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn read_timeout_is_bounded() {
        assert_eq!(parse_read_timeout("10ms").unwrap(), MIN_READ_TIMEOUT);
        assert_eq!(parse_read_timeout("60s").unwrap(), MAX_READ_TIMEOUT);
        assert_eq!(parse_read_timeout("9ms").unwrap_err().code, USAGE);
        assert_eq!(parse_read_timeout("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_read_timeout("61").unwrap_err().code, USAGE);
    }

    #[test]
    fn read_timeout_rejects_malformed_input() {
        assert!(parse_read_timeout("").is_err());
        assert!(parse_read_timeout("bad").is_err());
        assert!(parse_read_timeout("5m").is_err());
        assert!(parse_read_timeout("1.5s").is_err());
    }

    #[test]
    fn capture_args_build_session_config() {
        let args = CaptureArgs {
            link: LinkArgs {
                baud: 115_200,
                read_timeout: "750ms".to_string(),
                ..link("/dev/ttyUSB0")
            },
            package_size: 128,
            termination: TerminationArg::Counted,
            max_package_retries: 3,
            output_dir: PathBuf::from("out"),
            name: "cam_".to_string(),
        };

        let config = args.session_config().unwrap();
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.options.read_timeout, Duration::from_millis(750));
        assert_eq!(config.retrieval.package_size.get(), 128);
        assert_eq!(config.retrieval.termination, Termination::Counted);
        assert_eq!(config.retrieval.max_package_retries, 3);
    }

    #[test]
    fn out_of_range_package_size_is_usage_error() {
        let args = CaptureArgs {
            link: link("/dev/ttyUSB0"),
            package_size: 4096,
            termination: TerminationArg::Marker,
            max_package_retries: 8,
            output_dir: PathBuf::from("out"),
            name: "cam_".to_string(),
        };
        assert_eq!(args.session_config().unwrap_err().code, USAGE);
    }

    #[test]
    fn zero_sync_retries_is_usage_error() {
        let args = LinkArgs {
            sync_retries: 0,
            ..link("/dev/ttyUSB0")
        };
        assert_eq!(args.session_config().unwrap_err().code, USAGE);
    }
}
