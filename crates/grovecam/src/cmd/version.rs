use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("grovecam {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: grovecam");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("build_target: {}", env!("GROVECAM_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: serial={}, cli=true",
        cfg!(feature = "serial")
    );
    println!(
        "defaults: baud={}, package_size={}, termination={}",
        grovecam_protocol::DEFAULT_BAUD,
        grovecam_frame::PackageSize::DEFAULT,
        grovecam_protocol::Termination::default()
    );

    Ok(SUCCESS)
}
