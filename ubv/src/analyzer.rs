use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Result, UbvError};
use crate::index::UbvIndex;
use crate::sidecar::parse_sidecar;

/// The analyzer binary, looked up on the executable search path.
const UBVINFO: &str = "ubnt_ubvinfo";

/// Locations tried after the search path; this is where a Protect install
/// puts the tool.
const UBVINFO_STATIC_LOCATIONS: &[&str] =
    &["/usr/share/unifi-protect/app/node_modules/.bin/ubnt_ubvinfo"];

/// Analyse a .ubv file, picking between ubnt_ubvinfo and a pre-prepared
/// `<ubv>.txt` sidecar as appropriate.
///
/// When audio is not wanted the analyzer is restricted to the video track,
/// which reduces the volume of text it produces.
pub fn analyse(ubv_path: &str, include_audio: bool, video_track: u32) -> Result<UbvIndex> {
    let cached = format!("{}.txt", ubv_path);

    if Path::new(&cached).exists() {
        // Analysis file exists, read that instead of re-running ubnt_ubvinfo
        parse_sidecar_file(ubv_path, &cached)
    } else {
        run_ubvinfo(ubv_path, include_audio, video_track)
    }
}

/// Parse a cached analyzer dump from disk.
pub fn parse_sidecar_file(ubv_path: &str, sidecar_path: &str) -> Result<UbvIndex> {
    let file = std::fs::File::open(sidecar_path)?;
    parse_sidecar(ubv_path, BufReader::new(file))
}

/// Look for ubnt_ubvinfo on the search path and in the default install
/// locations. The lookup is per-call; nothing is memoized.
pub fn find_ubvinfo() -> Result<PathBuf> {
    if let Ok(path) = which::which(UBVINFO) {
        return Ok(path);
    }
    for location in UBVINFO_STATIC_LOCATIONS {
        if let Ok(path) = which::which(location) {
            return Ok(path);
        }
    }
    Err(UbvError::AnalyzerNotFound)
}

fn run_ubvinfo(ubv_path: &str, include_audio: bool, video_track: u32) -> Result<UbvIndex> {
    let binary = find_ubvinfo()?;

    let mut cmd = Command::new(&binary);
    if include_audio {
        cmd.args(["-P", "-f", ubv_path]);
    } else {
        cmd.args(["-t", &video_track.to_string(), "-P", "-f", ubv_path]);
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());

    let mut child = cmd.spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("ubnt_ubvinfo stdout was not captured"))?;

    // Drain the pipe inline while the child runs, then reap it
    match parse_sidecar(ubv_path, BufReader::new(stdout)) {
        Ok(index) => {
            let status = child.wait()?;
            if !status.success() {
                return Err(UbvError::AnalyzerFailed {
                    status,
                    file: ubv_path.to_string(),
                });
            }
            Ok(index)
        }
        Err(e) => {
            // Stop the analyzer before surfacing the parse failure
            let _ = child.kill();
            let _ = child.wait();
            Err(e)
        }
    }
}
