use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Result, UbvError};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Convert a wall-clock value (UTC time since 1970 in ticks of the track
/// timebase) to an instant.
///
/// The instant is `unix_epoch + (wc * 1e9) / tbc` nanoseconds. Uses u128
/// arithmetic internally to avoid overflow with large wall-clock values.
pub fn wc_to_instant(wc: u64, tbc: u32) -> Result<DateTime<Utc>> {
    if tbc == 0 {
        return Err(UbvError::BadTimestamp { wc, tbc });
    }

    let total_nanos = wc as u128 * NANOS_PER_SEC as u128 / tbc as u128;
    let secs = i64::try_from(total_nanos / NANOS_PER_SEC as u128)
        .map_err(|_| UbvError::BadTimestamp { wc, tbc })?;
    let nanos = (total_nanos % NANOS_PER_SEC as u128) as u32;

    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or(UbvError::BadTimestamp { wc, tbc })
}

/// Generate an `HH:MM:SS.FF` timecode string from a start time and framerate.
///
/// `HH:MM:SS` is the wall-clock time of day, and `FF` is the frame within
/// that second, indexed from 1: a clip starting at 11:58:26.500 in a 30fps
/// recording starts on frame 16, giving `11:58:26.16`. Frame numbers are
/// computed in integer arithmetic, so `FF` never exceeds the framerate.
pub fn generate_timecode(start: &DateTime<Utc>, rate: u32) -> String {
    let nanos = start.timestamp_subsec_nanos() as u64;
    let frame = nanos * rate as u64 / NANOS_PER_SEC + 1;
    format!("{}.{:02}", start.format("%H:%M:%S"), frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_wc_to_instant_90khz() {
        // 151548043939920 ticks at 90kHz = 1683867154.888s since epoch
        let instant = wc_to_instant(151548043939920, 90000).unwrap();
        assert_eq!(instant.timestamp(), 1683867154);
        assert_eq!(instant.timestamp_subsec_millis(), 888);
    }

    #[test]
    fn test_wc_to_instant_audio_rate() {
        // At 48kHz, 48000 ticks is exactly one second
        let instant = wc_to_instant(48000 * 1_000_000, 48000).unwrap();
        assert_eq!(instant.timestamp(), 1_000_000);
        assert_eq!(instant.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_wc_to_instant_zero_tbc_is_error() {
        assert!(wc_to_instant(1234, 0).is_err());
    }

    #[test]
    fn test_wc_to_instant_out_of_range() {
        assert!(wc_to_instant(u64::MAX, 1).is_err());
    }

    #[test]
    fn test_generate_timecode_half_second() {
        // 2023-05-16T11:58:26.500Z at 30fps is frame 16 (0.5 * 30 + 1)
        let start = Utc
            .with_ymd_and_hms(2023, 5, 16, 11, 58, 26)
            .unwrap()
            .checked_add_signed(Duration::milliseconds(500))
            .unwrap();
        assert_eq!(generate_timecode(&start, 30), "11:58:26.16");
    }

    #[test]
    fn test_generate_timecode_on_the_second() {
        let start = Utc.with_ymd_and_hms(2023, 5, 16, 15, 45, 13).unwrap();
        assert_eq!(generate_timecode(&start, 25), "15:45:13.01");
    }

    #[test]
    fn test_generate_timecode_top_of_second() {
        // 999,999,999ns at 30fps must stay on frame 30, not 31
        let start = Utc
            .with_ymd_and_hms(2023, 1, 1, 12, 0, 0)
            .unwrap()
            .checked_add_signed(Duration::nanoseconds(999_999_999))
            .unwrap();
        assert_eq!(generate_timecode(&start, 30), "12:00:00.30");
    }

    #[test]
    fn test_generate_timecode_length() {
        let start = Utc
            .with_ymd_and_hms(2023, 5, 16, 11, 58, 26)
            .unwrap()
            .checked_add_signed(Duration::milliseconds(730))
            .unwrap();
        for rate in [1, 24, 25, 30, 50, 60, 75, 99] {
            assert_eq!(generate_timecode(&start, rate).len(), 11, "rate {rate}");
        }
    }

    #[test]
    fn test_generate_timecode_timelapse() {
        let start = Utc.with_ymd_and_hms(2023, 5, 16, 3, 45, 13).unwrap();
        assert_eq!(generate_timecode(&start, 1), "03:45:13.01");
    }
}
