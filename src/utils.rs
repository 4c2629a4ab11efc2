use crate::error::{Result, VhsbError};

/// Writes `s` plus a trailing newline into a NUL-padded field of `len` bytes.
///
/// Strings longer than `len - 1` bytes are rejected rather than silently
/// truncated, so a header round-trips exactly.
pub fn pad_string_field(s: &str, len: usize, out: &mut Vec<u8>) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() + 1 > len {
        return Err(VhsbError::InvalidFormat(format!(
            "string '{}' does not fit in a {}-byte field",
            s, len
        )));
    }
    out.extend_from_slice(bytes);
    out.push(b'\n');
    out.resize(out.len() + (len - bytes.len() - 1), 0);
    Ok(())
}

/// First line of a NUL-padded string field: everything before the first
/// `\n` or NUL byte.
pub fn first_line(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n' || b == 0)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Median of a slice; the mean of the two middle values for even lengths.
/// Returns 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Maps a time value to its nearest 1-based sample index for a regularly
/// sampled stream: `s = 1 + round((t - t0) / dt)`.
///
/// Rounding is half-away-from-zero (`f64::round`), applied uniformly so
/// half-sample boundaries resolve the same way everywhere.
pub fn point_to_sample(t: f64, dt: f64, t0: f64) -> i64 {
    1 + ((t - t0) / dt).round() as i64
}

/// Inverse of [`point_to_sample`]: the time of 1-based sample `s`.
pub fn sample_to_point(s: i64, dt: f64, t0: f64) -> f64 {
    t0 + (s - 1) as f64 * dt
}
