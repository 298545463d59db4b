pub mod demux;
pub mod mp4mux;

use std::error::Error;
use std::path::Path;

use chrono::SecondsFormat;

use ubv::analyzer;
use ubv::index::UbvIndex;
use ubv::track::{TrackKind, TRACK_AUDIO, TRACK_VIDEO, TRACK_VIDEO_HEVC};

/// Configuration for remuxing UBV files.
#[derive(Debug, Clone)]
pub struct RemuxConfig {
    pub with_audio: bool,
    pub with_video: bool,
    /// Force a particular video framerate (0 = use the probed rate).
    pub force_rate: u32,
    /// Output directory. `"SRC-FOLDER"` means alongside the source .ubv
    /// file.
    pub output_folder: String,
    /// Create MP4 output (false = leave the raw bitstream files).
    pub mp4: bool,
    /// Video track id (7 = H.264, 1003 = HEVC).
    pub video_track: u32,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            with_audio: false,
            with_video: true,
            force_rate: 0,
            output_folder: "./".to_string(),
            mp4: true,
            video_track: TRACK_VIDEO,
        }
    }
}

/// Validate a remux configuration (without checking input files).
pub fn validate_config(config: &RemuxConfig) -> Result<(), String> {
    if !config.with_audio && !config.with_video {
        return Err("Must enable extraction of at least one of: audio, video!".into());
    }
    if config.video_track != TRACK_VIDEO && config.video_track != TRACK_VIDEO_HEVC {
        return Err(format!(
            "Unsupported video track id {} (expected 7 for H.264 or 1003 for HEVC)",
            config.video_track
        ));
    }
    Ok(())
}

/// Process a single .ubv file: index it via the analyzer, then demux (and
/// optionally mux) every partition. Returns the output files generated.
///
/// Any failure is fatal for the whole file: no partition is skipped or
/// retried. The demuxer flushes whatever it wrote before an error surfaces,
/// so partial outputs may remain on disk for the caller to clean up.
pub fn process_file(ubv_path: &str, config: &RemuxConfig) -> Result<Vec<String>, Box<dyn Error>> {
    log::info!("Analysing {}", ubv_path);
    let mut index = analyzer::analyse(ubv_path, config.with_audio, config.video_track)?;

    log_parse_summary(&index, config.video_track);

    // Optionally apply the user's forced framerate
    if config.force_rate > 0 {
        log::info!(
            "Framerate forced by user instruction: using {} fps",
            config.force_rate
        );
        force_video_rate(&mut index, config.force_rate);
    }

    let multi_partition = index.partitions.len() > 1;
    let mut outputs = Vec::new();

    for partition in &index.partitions {
        let basename = output_basename(
            ubv_path,
            &config.output_folder,
            partition.index,
            multi_partition,
        );

        let video_file = if config.with_video && partition.video_track_count > 0 {
            Some(format!(
                "{}.{}",
                basename,
                video_extension(config.video_track)
            ))
        } else {
            None
        };
        let audio_file = if config.with_audio && partition.audio_track_count > 0 {
            Some(format!("{}.aac", basename))
        } else {
            None
        };

        if video_file.is_none() && audio_file.is_none() {
            log::info!(
                "Partition #{} has no frames of the requested tracks, skipping",
                partition.index
            );
            continue;
        }

        demux::demux_partition(
            ubv_path,
            partition,
            video_file.as_deref(),
            config.video_track,
            audio_file.as_deref(),
        )?;

        if config.mp4 {
            let mp4_file = format!("{}.mp4", basename);
            log::info!("Generating MP4 {}...", mp4_file);

            let created = mp4mux::mux_partition(
                partition,
                config.video_track,
                video_file.as_deref(),
                audio_file.as_deref(),
                &mp4_file,
            )?;
            if created {
                outputs.push(mp4_file);
            }

            // The raw bitstreams were only inputs for the muxer
            for path in [&video_file, &audio_file].into_iter().flatten() {
                if let Err(e) = std::fs::remove_file(path) {
                    log::warn!("Warning: could not delete {}: {}", path, e);
                }
            }
        } else {
            outputs.extend(video_file);
            outputs.extend(audio_file);
        }
    }

    Ok(outputs)
}

/// Override the probed rate of every video track ahead of extraction.
fn force_video_rate(index: &mut UbvIndex, rate: u32) {
    for partition in &mut index.partitions {
        for track in partition.tracks.values_mut() {
            if track.kind == TrackKind::Video {
                track.rate = rate;
            }
        }
    }
}

fn log_parse_summary(index: &UbvIndex, video_track: u32) {
    log::info!("*** Parsing complete! ***");
    log::info!("Number of partitions: {}", index.partitions.len());

    if let Some(first) = index.partitions.first() {
        log::info!("First Partition:");
        log::info!("\tTracks: {}", first.tracks.len());
        log::info!("\tFrames: {}", first.frames.len());

        let start = first
            .tracks
            .get(&video_track)
            .or_else(|| first.tracks.get(&TRACK_AUDIO))
            .map(|t| t.start_timecode);
        if let Some(tc) = start {
            log::info!(
                "\tStart Timecode: {}",
                tc.to_rfc3339_opts(SecondsFormat::Secs, true)
            );
        }
    }
}

/// Derive the per-partition output path, without extension.
///
/// Multi-partition files get one output set per partition, suffixed `_p<n>`;
/// single-partition files keep the plain input stem.
fn output_basename(
    ubv_path: &str,
    output_folder: &str,
    partition_index: u32,
    multi_partition: bool,
) -> String {
    let folder = output_folder.trim_end_matches(['/', '\\']);
    let folder = if folder == "SRC-FOLDER" {
        Path::new(ubv_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string())
    } else {
        folder.to_string()
    };

    let stem = Path::new(ubv_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let name = if multi_partition {
        format!("{}_p{}", stem, partition_index)
    } else {
        stem
    };

    Path::new(&folder).join(name).to_string_lossy().to_string()
}

fn video_extension(video_track: u32) -> &'static str {
    match video_track {
        TRACK_VIDEO_HEVC => "hevc",
        _ => "h264",
    }
}
