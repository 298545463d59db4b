use std::path::Path;

use clap::{ArgAction, Parser};

use remux_lib::RemuxConfig;

/// UBV Remux Tool — converts .ubv files to MP4.
#[derive(Parser)]
#[command(name = "remux")]
struct Args {
    /// Extract audio stream?
    #[arg(long = "with-audio", default_value_t = false, action = ArgAction::Set)]
    with_audio: bool,

    /// Extract video stream?
    #[arg(long = "with-video", default_value_t = true, action = ArgAction::Set)]
    with_video: bool,

    /// Force a particular video framerate instead of the probed one (0 = use the probed rate)
    #[arg(long = "force-rate", default_value_t = 0)]
    force_rate: u32,

    /// Output directory ("SRC-FOLDER" = alongside .ubv files)
    #[arg(long = "output-folder", default_value = "./")]
    output_folder: String,

    /// Create MP4 output
    #[arg(long = "mp4", default_value_t = true, action = ArgAction::Set)]
    mp4: bool,

    /// Video track number (7 = H.264, 1003 = HEVC)
    #[arg(long = "video-track", default_value_t = 7)]
    video_track: u32,

    /// Stop on the first failing file instead of continuing and reporting failures at the end
    #[arg(long = "fail-fast", default_value_t = false, action = ArgAction::Set)]
    fail_fast: bool,

    /// Display version and quit
    #[arg(long = "version")]
    version: bool,

    /// Input .ubv files
    files: Vec<String>,
}

/// Convert known single-dash flags to double-dash for clap compatibility.
/// Handles both `-flag value` and `-flag=value` forms.
fn normalise_args(args: Vec<String>) -> Vec<String> {
    let known_flags = [
        "-with-audio",
        "-with-video",
        "-force-rate",
        "-output-folder",
        "-mp4",
        "-video-track",
        "-fail-fast",
        "-version",
    ];

    args.into_iter()
        .map(|arg| {
            for flag in &known_flags {
                if arg == *flag {
                    return format!("-{}", flag);
                }
                let prefix = format!("{}=", flag);
                if arg.starts_with(&prefix) {
                    return format!("-{}", arg);
                }
            }
            arg
        })
        .collect()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let raw_args: Vec<String> = std::env::args().collect();
    let normalised = normalise_args(raw_args);
    let args = Args::parse_from(normalised);

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.version {
        ubv::version::print_cli_version_banner(
            "UBV Remux Tool",
            env!("CARGO_PKG_VERSION"),
            env!("RELEASE_VERSION"),
            env!("GIT_COMMIT"),
        );
        return Ok(());
    }

    validate_args(args)?;
    remux_cli(args)
}

/// Expand glob patterns in the file list. On Unix the shell normally expands
/// globs before the process sees them, but on Windows `cmd.exe` and
/// PowerShell pass the literal pattern (e.g. `*.ubv`) to the program.
fn expand_globs(patterns: &[String]) -> Vec<String> {
    let mut result = Vec::new();
    for pattern in patterns {
        // Only attempt glob expansion if the argument contains metacharacters
        // AND does not match an existing file on disk (so that filenames
        // containing '[', '?' etc. are handled correctly).
        let has_glob_chars =
            pattern.contains('*') || pattern.contains('?') || pattern.contains('[');
        if has_glob_chars && !Path::new(pattern).exists() {
            match glob::glob(pattern) {
                Ok(paths) => {
                    let mut matched = false;
                    for entry in paths.flatten() {
                        result.push(entry.to_string_lossy().to_string());
                        matched = true;
                    }
                    if !matched {
                        // No matches — keep the original so the user gets a
                        // meaningful "file not found" error downstream.
                        result.push(pattern.clone());
                    }
                }
                Err(_) => result.push(pattern.clone()),
            }
        } else {
            result.push(pattern.clone());
        }
    }
    result
}

fn validate_args(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.files.is_empty() {
        return Err("Expected at least one .ubv file as input!".into());
    }

    remux_lib::validate_config(&args_to_config(args))?;

    Ok(())
}

fn args_to_config(args: &Args) -> RemuxConfig {
    RemuxConfig {
        with_audio: args.with_audio,
        with_video: args.with_video,
        force_rate: args.force_rate,
        output_folder: args.output_folder.clone(),
        mp4: args.mp4,
        video_track: args.video_track,
    }
}

fn remux_cli(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let files = expand_globs(&args.files);
    let config = args_to_config(args);

    let mut failures: Vec<String> = Vec::new();

    for ubv_path in &files {
        match remux_lib::process_file(ubv_path, &config) {
            Ok(outputs) => {
                for output in outputs {
                    log::info!("Output: {}", output);
                }
            }
            Err(e) => {
                let message = format!("{}: {}", ubv_path, e);
                if args.fail_fast {
                    return Err(message.into());
                }
                log::warn!("{}", message);
                failures.push(message);
            }
        }
    }

    if !failures.is_empty() {
        log::error!("");
        log::error!("OPERATION COMPLETED WITH ERRORS:");
        for failure in &failures {
            log::error!("  {}", failure);
        }
        return Err(format!("{} error(s) encountered during processing", failures.len()).into());
    }

    Ok(())
}
