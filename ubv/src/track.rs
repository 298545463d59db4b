use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::wc_to_instant;
use crate::error::{Result, UbvError};

/// Track ID constants: the closed set of track ids this tool understands.
pub const TRACK_VIDEO: u32 = 7;
pub const TRACK_AUDIO: u32 = 1000;
pub const TRACK_VIDEO_HEVC: u32 = 1003;

/// Number of inter-frame rate estimates to collect before settling on a
/// video framerate.
pub const RATE_PROBE_WINDOW: usize = 32;

/// Maximum framerate the probe will accept. The Unifi camera line currently
/// tops out at 55fps on G4 Pro HFR mode, so 75fps leaves headroom.
pub const MAX_PROBED_FPS: u32 = 75;

/// Track classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Classify a track id. Returns `None` for ids outside the closed set.
pub fn track_kind(track_id: u32) -> Option<TrackKind> {
    match track_id {
        TRACK_VIDEO | TRACK_VIDEO_HEVC => Some(TrackKind::Video),
        TRACK_AUDIO => Some(TrackKind::Audio),
        _ => None,
    }
}

/// Returns true if this track id is a video track.
pub fn is_video_track(track_id: u32) -> bool {
    track_kind(track_id) == Some(TrackKind::Video)
}

/// Returns true if this track id is an audio track.
pub fn is_audio_track(track_id: u32) -> bool {
    track_kind(track_id) == Some(TrackKind::Audio)
}

/// A logical stream within a partition, with the timing and rate metadata
/// the muxer needs.
#[derive(Debug, Clone, Serialize)]
pub struct UbvTrack {
    pub track_id: u32,
    pub kind: TrackKind,

    /// Date+time of the first frame in this partition.
    pub start_timecode: DateTime<Utc>,

    /// Date+time of the most recent frame seen.
    pub last_timecode: DateTime<Utc>,

    /// Frames per second (video) or sample rate (audio).
    ///
    /// For audio this is the timebase of the first frame (Ubiquiti use the
    /// sample rate directly as the audio packet timebase). For video it is 0
    /// while the rate probe is still collecting, and positive once the track
    /// is finalized.
    pub rate: u32,

    /// Number of frames (video) or packets (audio).
    pub frame_count: u64,

    #[serde(skip)]
    probe: RateProbe,
}

/// Per-frame rate estimates collected while probing a video track.
#[derive(Debug, Clone, Default)]
struct RateProbe {
    window: Vec<u32>,
    last_wc: u64,
}

impl UbvTrack {
    /// Create a track from the first frame seen for its id within a
    /// partition. Fails on an id outside the closed set.
    pub fn from_first_frame(track_id: u32, wc: u64, tbc: u32) -> Result<Self> {
        let kind = track_kind(track_id).ok_or(UbvError::UnknownTrack { track_id })?;
        let instant = wc_to_instant(wc, tbc)?;

        let mut track = UbvTrack {
            track_id,
            kind,
            start_timecode: instant,
            last_timecode: instant,
            rate: 0,
            frame_count: 1,
            probe: RateProbe {
                window: Vec::with_capacity(RATE_PROBE_WINDOW),
                last_wc: wc,
            },
        };

        match kind {
            TrackKind::Audio => track.rate = tbc,
            TrackKind::Video => {
                log::info!("First Frame: {}", instant.format("%Y-%m-%dT%H:%M:%S%.3fZ"));
            }
        }

        Ok(track)
    }

    /// Record a subsequent frame for this track: advances the last timecode
    /// and, for a video track still probing, feeds the rate estimation
    /// window. Fails if the filled window yields an unusable rate.
    pub fn observe_frame(&mut self, wc: u64, tbc: u32) -> Result<()> {
        self.last_timecode = wc_to_instant(wc, tbc)?;
        self.frame_count += 1;

        if self.kind == TrackKind::Video && self.rate == 0 {
            if self.probe.window.len() < RATE_PROBE_WINDOW {
                let delta = wc.saturating_sub(self.probe.last_wc);
                if delta > 0 {
                    let estimate = (tbc as u64 / delta).min(u32::MAX as u64) as u32;
                    self.probe.window.push(estimate);
                }
                self.probe.last_wc = wc;
            }
            if self.probe.window.len() == RATE_PROBE_WINDOW {
                self.resolve_rate()?;
            }
        }

        Ok(())
    }

    /// Settle the rate of a video track whose partition ended before the
    /// probe window filled. No-op for audio tracks and resolved probes.
    pub fn finalize(&mut self) -> Result<()> {
        if self.kind == TrackKind::Video && self.rate == 0 {
            self.resolve_rate()?;
        }
        Ok(())
    }

    fn resolve_rate(&mut self) -> Result<()> {
        let rate = mode_rate(&self.probe.window);

        if rate > 0 && rate <= MAX_PROBED_FPS {
            self.rate = rate;
            log::info!(
                "Video Rate Probe: File appears to be {} fps. Use -force-rate if incorrect.",
                rate
            );
        } else if rate == 0 {
            log::warn!(
                "Video Rate Probe: probed rate was 0 fps. Assuming timelapse file and using 1fps"
            );
            self.rate = 1;
        } else {
            return Err(UbvError::RateProbeFailed { rate });
        }

        Ok(())
    }
}

/// Most frequent positive value in the probe window (0 when there is none).
fn mode_rate(window: &[u32]) -> u32 {
    let mut best_val = 0u32;
    let mut best_count = 0u32;
    // O(n^2) frequency count; the window holds at most 32 entries
    let mut counts: Vec<(u32, u32)> = Vec::new();

    for &val in window {
        if val == 0 {
            continue;
        }
        let count = match counts.iter_mut().find(|(v, _)| *v == val) {
            Some(entry) => {
                entry.1 += 1;
                entry.1
            }
            None => {
                counts.push((val, 1));
                1
            }
        };
        if count > best_count {
            best_count = count;
            best_val = val;
        }
    }

    best_val
}
