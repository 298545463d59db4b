use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};

use ubv::index::{Frame, Partition};
use ubv::track::is_audio_track;

/// 4-byte Annex B NAL start code.
const NAL_START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Demux a single partition's frames into raw video and/or audio bitstream
/// files.
///
/// Reads frame payloads from the .ubv file at the offsets recorded in the
/// index, rewriting video NAL framing from length prefixes to start codes
/// and copying audio verbatim. The sinks are buffered and flushed on every
/// exit path, so anything written before a failure is on disk when the error
/// surfaces.
pub fn demux_partition(
    ubv_path: &str,
    partition: &Partition,
    video_path: Option<&str>,
    video_track: u32,
    audio_path: Option<&str>,
) -> io::Result<()> {
    // Open .ubv without buffering — we seek heavily
    let mut ubv_file = File::open(ubv_path)?;
    let ubv_len = ubv_file.metadata()?.len();

    let mut video_writer = match video_path {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };
    let mut audio_writer = match audio_path {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let copied = copy_frames(
        &mut ubv_file,
        ubv_len,
        partition,
        &mut video_writer,
        video_track,
        &mut audio_writer,
    );

    let video_flushed = video_writer.as_mut().map_or(Ok(()), |w| w.flush());
    let audio_flushed = audio_writer.as_mut().map_or(Ok(()), |w| w.flush());

    copied.and(video_flushed).and(audio_flushed)
}

fn copy_frames(
    ubv_file: &mut File,
    ubv_len: u64,
    partition: &Partition,
    video_writer: &mut Option<BufWriter<File>>,
    video_track: u32,
    audio_writer: &mut Option<BufWriter<File>>,
) -> io::Result<()> {
    // Reusable buffer sized to the largest frame in the partition
    let mut buffer = vec![0u8; partition.largest_frame_size() as usize];

    // Opening NAL separator for the video bitstream
    if let Some(vw) = video_writer {
        vw.write_all(&NAL_START_CODE)?;
    }

    for frame in &partition.frames {
        if frame.offset + frame.size as u64 > ubv_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame range beyond end of file: offset={}, size={}, file length={}",
                    frame.offset, frame.size, ubv_len
                ),
            ));
        }

        if frame.track_id == video_track {
            if let Some(vw) = video_writer.as_mut() {
                write_video_frame(ubv_file, frame, vw, &mut buffer)?;
            }
        } else if is_audio_track(frame.track_id) {
            if let Some(aw) = audio_writer.as_mut() {
                write_audio_frame(ubv_file, frame, aw, &mut buffer)?;
            }
        }
    }

    Ok(())
}

/// Iterate over the length-prefixed NAL units inside a video frame, calling
/// `f` with each NAL payload.
fn for_each_nal<F>(ubv_file: &mut File, frame: &Frame, read_buf: &mut [u8], mut f: F) -> io::Result<()>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut pos = 0u32;

    ubv_file.seek(SeekFrom::Start(frame.offset))?;

    while pos < frame.size {
        // 4-byte big-endian NAL length prefix
        let mut len_buf = [0u8; 4];
        ubv_file.read_exact(&mut len_buf)?;
        let nal_size = u32::from_be_bytes(len_buf);
        pos += 4;

        if pos > frame.size || nal_size > frame.size - pos {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "NAL read goes beyond frame at offset {}: pos={}, nal_size={}, frame size={}",
                    frame.offset, pos, nal_size, frame.size
                ),
            ));
        }

        ubv_file.read_exact(&mut read_buf[..nal_size as usize])?;
        pos += nal_size;

        f(&read_buf[..nal_size as usize])?;
    }

    Ok(())
}

/// Write a video frame: read length-prefixed NALs and emit each with a
/// 00 00 00 01 separator after it.
fn write_video_frame(
    ubv_file: &mut File,
    frame: &Frame,
    writer: &mut impl Write,
    buffer: &mut [u8],
) -> io::Result<()> {
    for_each_nal(ubv_file, frame, buffer, |nal| {
        writer.write_all(nal)?;
        writer.write_all(&NAL_START_CODE)
    })
}

/// Write an audio frame: raw data copy, no NAL processing.
fn write_audio_frame(
    ubv_file: &mut File,
    frame: &Frame,
    writer: &mut impl Write,
    buffer: &mut [u8],
) -> io::Result<()> {
    ubv_file.seek(SeekFrom::Start(frame.offset))?;
    ubv_file.read_exact(&mut buffer[..frame.size as usize])?;
    writer.write_all(&buffer[..frame.size as usize])
}
