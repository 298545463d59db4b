use std::io::BufRead;
use std::str::FromStr;

use crate::error::{Result, UbvError};
use crate::index::{Frame, Partition, UbvIndex};
use crate::track::{TrackKind, UbvTrack};

/// Sidecar line that begins a new partition.
const PARTITION_START: &str = "----------- PARTITION START -----------";

// Column indexes in the whitespace-split frame lines of ubnt_ubvinfo output.
// Layout: Type TID KF OFFSET SIZE DTS CTS WC CR ...
const FIELD_TRACK_ID: usize = 1;
const FIELD_OFFSET: usize = 3;
const FIELD_SIZE: usize = 4;
/// Wall-clock: UTC time since 1970, expressed in units of FIELD_WC_TBC.
const FIELD_WC: usize = 7;
/// Timebase for the track.
const FIELD_WC_TBC: usize = 8;

/// Parse the textual frame dump of ubnt_ubvinfo into a structural index.
///
/// The first non-empty line is the column header and is skipped. A literal
/// partition marker starts a new partition; frame lines begin with
/// whitespace. Frame lines before the first marker and any other lines are
/// ignored. N.B. this is a fragile mechanism by nature: if the analyzer's
/// output format changes, this parser must change with it.
pub fn parse_sidecar<R: BufRead>(filename: &str, reader: R) -> Result<UbvIndex> {
    let mut partitions: Vec<Partition> = Vec::new();
    let mut header_seen = false;

    for line in reader.lines() {
        let line = line?;

        if !header_seen {
            if !line.trim().is_empty() {
                header_seen = true;
            }
        } else if line == PARTITION_START {
            if let Some(previous) = partitions.last_mut() {
                finalize_partition(previous)?;
            }
            log::info!("New partition");
            partitions.push(Partition::new(partitions.len() as u32));
        } else if starts_with_whitespace(&line) && !line.trim().is_empty() {
            if let Some(current) = partitions.last_mut() {
                parse_frame_line(&line, current)?;
            }
        }
    }

    if let Some(last) = partitions.last_mut() {
        finalize_partition(last)?;
    }

    Ok(UbvIndex {
        filename: filename.to_string(),
        partitions,
        complete: true,
    })
}

fn starts_with_whitespace(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_whitespace())
}

fn parse_frame_line(line: &str, partition: &mut Partition) -> Result<()> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    let track_id: u32 = parse_field(&fields, FIELD_TRACK_ID, "track number", line)?;
    let offset: u64 = parse_field(&fields, FIELD_OFFSET, "offset", line)?;
    let size: u32 = parse_field(&fields, FIELD_SIZE, "frame size", line)?;
    let wc: u64 = parse_field(&fields, FIELD_WC, "WC", line)?;
    let tbc: u32 = parse_field(&fields, FIELD_WC_TBC, "TBC", line)?;

    // Bail on a TBC of 0, otherwise deriving the instant would divide by zero
    if tbc == 0 {
        return Err(UbvError::ZeroTimebase {
            line: line.to_string(),
        });
    }
    if size == 0 {
        return Err(UbvError::ZeroSize { offset });
    }

    match partition.tracks.get_mut(&track_id) {
        Some(track) => track.observe_frame(wc, tbc)?,
        None => {
            // Bail on an unexpected track id: we could silently ignore it,
            // but it is more useful to surface new cases
            let track = UbvTrack::from_first_frame(track_id, wc, tbc)?;
            match track.kind {
                TrackKind::Video => partition.video_track_count += 1,
                TrackKind::Audio => partition.audio_track_count += 1,
            }
            partition.tracks.insert(track_id, track);
        }
    }

    partition.frames.push(Frame {
        track_id,
        offset,
        size,
    });
    partition.frame_count += 1;

    Ok(())
}

fn parse_field<T>(fields: &[&str], index: usize, field: &'static str, line: &str) -> Result<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    let raw = fields.get(index).ok_or_else(|| UbvError::MissingField {
        field,
        line: line.to_string(),
    })?;

    raw.parse().map_err(|source| UbvError::BadField {
        field,
        line: line.to_string(),
        source,
    })
}

/// Settle video rates for tracks whose probe window never filled.
fn finalize_partition(partition: &mut Partition) -> Result<()> {
    for track in partition.tracks.values_mut() {
        track.finalize()?;
    }
    Ok(())
}
