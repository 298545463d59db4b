use std::io;
use std::path::PathBuf;
use std::process::Command;

use ubv::clock::generate_timecode;
use ubv::index::Partition;
use ubv::track::UbvTrack;

/// Static locations we fall back on if FFmpeg isn't available on the search
/// path (the arm64 static build shipped for NVR hardware).
const FFMPEG_STATIC_LOCATIONS: &[&str] =
    &["/root/ffmpeg", "/root/ffmpeg-4.3.1-arm64-static/ffmpeg"];

/// Look for ffmpeg on the search path and in the static fallback locations.
pub fn find_ffmpeg() -> io::Result<PathBuf> {
    if let Ok(path) = which::which("ffmpeg") {
        return Ok(path);
    }
    for location in FFMPEG_STATIC_LOCATIONS {
        if let Ok(path) = which::which(location) {
            return Ok(path);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "Cannot invoke FFmpeg: does not appear to be installed on the local system",
    ))
}

/// Mux the partition's demuxed bitstreams into an MP4 by spawning ffmpeg.
///
/// Returns `Ok(false)` when there was nothing to mux (no stream of either
/// requested kind had frames), in which case no output file is produced.
pub fn mux_partition(
    partition: &Partition,
    video_track: u32,
    video_file: Option<&str>,
    audio_file: Option<&str>,
    mp4_file: &str,
) -> io::Result<bool> {
    let args = match build_mux_args(partition, video_track, video_file, audio_file, mp4_file) {
        Some(args) => args,
        None => {
            log::info!(
                "Streams contained zero frames! Skipping this output file: {}",
                mp4_file
            );
            return Ok(false);
        }
    };

    let ffmpeg = find_ffmpeg()?;
    log::info!("Running: {} {}", ffmpeg.display(), args.join(" "));

    // stdout/stderr pass through so ffmpeg warnings reach the user
    let status = Command::new(&ffmpeg).args(&args).status()?;
    if !status.success() {
        return Err(io::Error::other(format!(
            "FFmpeg operation failed with {}. To get error information, re-run command manually: {} {}",
            status,
            ffmpeg.display(),
            args.join(" ")
        )));
    }

    Ok(true)
}

/// Build the ffmpeg argument list for muxing the given bitstreams.
///
/// With both streams present, the audio input carries an `-itsoffset` of
/// `(video start − audio start)` seconds so the streams line up in the
/// output. The video stream is stamped with its start timecode and copied at
/// the track rate; essence is never transcoded.
pub fn build_mux_args(
    partition: &Partition,
    video_track: u32,
    video_file: Option<&str>,
    audio_file: Option<&str>,
    mp4_file: &str,
) -> Option<Vec<String>> {
    let video = video_file.zip(partition.tracks.get(&video_track));
    let audio = audio_file.zip(partition.audio_track());

    let mut args: Vec<String> = Vec::new();

    match (video, audio) {
        (Some((vf, vt)), Some((af, at))) => {
            args.extend(["-i".into(), vf.into()]);
            let delay_millis = audio_delay_millis(vt, at);
            if delay_millis != 0 {
                args.extend(["-itsoffset".into(), format_seconds(delay_millis)]);
            }
            args.extend(["-i".into(), af.into()]);
            args.extend(["-map".into(), "0:v".into(), "-map".into(), "1:a".into()]);
            push_copy_args(&mut args, Some(vt));
        }
        (Some((vf, vt)), None) => {
            args.extend(["-i".into(), vf.into()]);
            push_copy_args(&mut args, Some(vt));
        }
        (None, Some((af, _))) => {
            args.extend(["-i".into(), af.into()]);
            push_copy_args(&mut args, None);
        }
        (None, None) => return None,
    }

    args.extend(["-y".into(), "-loglevel".into(), "warning".into()]);
    args.push(mp4_file.into());

    Some(args)
}

/// How far the audio stream start lags the video stream start, in
/// milliseconds. Positive when video starts later.
fn audio_delay_millis(video_track: &UbvTrack, audio_track: &UbvTrack) -> i64 {
    video_track
        .start_timecode
        .signed_duration_since(audio_track.start_timecode)
        .num_milliseconds()
}

fn format_seconds(millis: i64) -> String {
    format!("{}", millis as f64 / 1000.0)
}

fn push_copy_args(args: &mut Vec<String>, video_track: Option<&UbvTrack>) {
    args.extend(["-c".into(), "copy".into()]);
    if let Some(vt) = video_track {
        args.extend(["-r".into(), vt.rate.to_string()]);
        args.extend([
            "-metadata".into(),
            format!(
                "timecode={}",
                generate_timecode(&vt.start_timecode, vt.rate)
            ),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ubv::index::Partition;
    use ubv::track::{UbvTrack, TRACK_AUDIO, TRACK_VIDEO};

    /// Partition with a 30fps video track starting 2.5s after the audio
    /// track.
    fn av_partition() -> Partition {
        let mut partition = Partition::new(0);

        // Audio starts at 1,000,000s since epoch (48kHz ticks)
        let audio = UbvTrack::from_first_frame(TRACK_AUDIO, 1_000_000 * 48_000, 48_000).unwrap();
        partition.tracks.insert(TRACK_AUDIO, audio);
        partition.audio_track_count = 1;

        // Video starts 2.5s later (90kHz ticks)
        let mut video =
            UbvTrack::from_first_frame(TRACK_VIDEO, 1_000_002 * 90_000 + 45_000, 90_000).unwrap();
        video.rate = 30;
        partition.tracks.insert(TRACK_VIDEO, video);
        partition.video_track_count = 1;

        partition
    }

    #[test]
    fn test_av_args_offset_audio_by_stream_start_difference() {
        let partition = av_partition();
        let args = build_mux_args(
            &partition,
            TRACK_VIDEO,
            Some("out.h264"),
            Some("out.aac"),
            "out.mp4",
        )
        .unwrap();

        assert_eq!(
            args,
            vec![
                "-i",
                "out.h264",
                "-itsoffset",
                "2.5",
                "-i",
                "out.aac",
                "-map",
                "0:v",
                "-map",
                "1:a",
                "-c",
                "copy",
                "-r",
                "30",
                "-metadata",
                "timecode=13:46:42.16",
                "-y",
                "-loglevel",
                "warning",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_av_args_negative_offset_when_video_starts_first() {
        let mut partition = av_partition();
        // Move the audio start 0.5s after the video start
        let audio = UbvTrack::from_first_frame(TRACK_AUDIO, 1_000_003 * 48_000, 48_000).unwrap();
        partition.tracks.insert(TRACK_AUDIO, audio);

        let args = build_mux_args(
            &partition,
            TRACK_VIDEO,
            Some("out.h264"),
            Some("out.aac"),
            "out.mp4",
        )
        .unwrap();

        let offset_pos = args.iter().position(|a| a == "-itsoffset").unwrap();
        assert_eq!(args[offset_pos + 1], "-0.5");
    }

    #[test]
    fn test_av_args_omit_zero_offset() {
        let mut partition = av_partition();
        // Same instant as the video start, expressed in 48kHz ticks
        let audio =
            UbvTrack::from_first_frame(TRACK_AUDIO, 1_000_002 * 48_000 + 24_000, 48_000).unwrap();
        partition.tracks.insert(TRACK_AUDIO, audio);

        let args = build_mux_args(
            &partition,
            TRACK_VIDEO,
            Some("out.h264"),
            Some("out.aac"),
            "out.mp4",
        )
        .unwrap();

        assert!(!args.contains(&"-itsoffset".to_string()));
    }

    #[test]
    fn test_video_only_args() {
        let mut partition = av_partition();
        partition.tracks.remove(&TRACK_AUDIO);

        let args = build_mux_args(&partition, TRACK_VIDEO, Some("out.h264"), None, "out.mp4")
            .unwrap();

        assert_eq!(
            args,
            vec![
                "-i",
                "out.h264",
                "-c",
                "copy",
                "-r",
                "30",
                "-metadata",
                "timecode=13:46:42.16",
                "-y",
                "-loglevel",
                "warning",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_audio_only_args() {
        let partition = av_partition();
        let args =
            build_mux_args(&partition, TRACK_VIDEO, None, Some("out.aac"), "out.mp4").unwrap();

        assert_eq!(
            args,
            vec![
                "-i",
                "out.aac",
                "-c",
                "copy",
                "-y",
                "-loglevel",
                "warning",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_nothing_to_mux() {
        let partition = Partition::new(0);
        assert!(build_mux_args(&partition, TRACK_VIDEO, Some("out.h264"), None, "out.mp4").is_none());
        assert!(build_mux_args(&partition, TRACK_VIDEO, None, None, "out.mp4").is_none());
    }
}
