use std::collections::BTreeMap;

use serde::Serialize;

use crate::track::{UbvTrack, TRACK_AUDIO};

/// A single frame record: where its payload lives in the .ubv file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub track_id: u32,
    /// Absolute byte offset of the payload in the .ubv file.
    pub offset: u64,
    /// Payload size in bytes.
    pub size: u32,
}

/// A self-contained recording segment within a UBV file.
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    /// Partition index (0-based, file order).
    pub index: u32,
    /// Tracks keyed by track id.
    pub tracks: BTreeMap<u32, UbvTrack>,
    /// Frames in the order they appeared in the sidecar dump (file order).
    pub frames: Vec<Frame>,
    pub video_track_count: u32,
    pub audio_track_count: u32,
    pub frame_count: u64,
}

impl Partition {
    pub fn new(index: u32) -> Self {
        Partition {
            index,
            tracks: BTreeMap::new(),
            frames: Vec::new(),
            video_track_count: 0,
            audio_track_count: 0,
            frame_count: 0,
        }
    }

    /// Size of the largest frame in this partition; bounds the scratch
    /// buffer needed to extract it.
    pub fn largest_frame_size(&self) -> u32 {
        self.frames.iter().map(|f| f.size).max().unwrap_or(0)
    }

    pub fn audio_track(&self) -> Option<&UbvTrack> {
        self.tracks.get(&TRACK_AUDIO)
    }
}

/// Structural index of a UBV file, as reported by the sidecar analyzer.
#[derive(Debug, Clone, Serialize)]
pub struct UbvIndex {
    /// Path of the .ubv file this index describes.
    pub filename: String,
    pub partitions: Vec<Partition>,
    /// True once the entire sidecar output was consumed without a fatal
    /// error.
    pub complete: bool,
}
