use thiserror::Error;

#[derive(Error, Debug)]
pub enum UbvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ubnt_ubvinfo not on PATH, nor in any default search locations!")]
    AnalyzerNotFound,

    #[error("ubnt_ubvinfo exited with {status} against {file}")]
    AnalyzerFailed {
        status: std::process::ExitStatus,
        file: String,
    },

    #[error("error parsing {field} field in line {line:?}: {source}")]
    BadField {
        field: &'static str,
        line: String,
        source: std::num::ParseIntError,
    },

    #[error("frame line too short, missing {field} field: {line:?}")]
    MissingField { field: &'static str, line: String },

    #[error("encountered track id other than 7, 1003 or 1000: {track_id}")]
    UnknownTrack { track_id: u32 },

    #[error("parsed TBC of 0 for line {line:?}")]
    ZeroTimebase { line: String },

    #[error("frame with zero size at offset {offset}")]
    ZeroSize { offset: u64 },

    #[error("cannot derive timestamp from {wc} ticks at {tbc} Hz")]
    BadTimestamp { wc: u64, tbc: u32 },

    #[error("Video Rate Probe: probed rate was {rate} fps. Assuming invalid. Please use -force-rate (e.g. -force-rate 25) based on your camera's frame rate")]
    RateProbeFailed { rate: u32 },
}

pub type Result<T> = std::result::Result<T, UbvError>;
