//! Millisecond offset to SRT clock string conversion.

/// Formats a millisecond offset as an SRT timecode (`HH:MM:SS,mmm`).
///
/// Hours are zero-padded to at least two digits and grow wider for
/// durations past 99 hours. Milliseconds are always three digits. This is
/// pure duration arithmetic; no timezone or locale is involved.
pub fn format_timecode(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
