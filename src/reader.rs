use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::{Result, VhsbError};
use crate::header::VhsbHeader;
use crate::types::Tensor;
use crate::utils::{point_to_sample, sample_to_point};
use crate::HEADER_SIZE;

/// Parses and validates the header of a VHSB file without touching the
/// sample block.
///
/// # Errors
///
/// * [`VhsbError::FileNotFound`] - the file does not exist
/// * [`VhsbError::InvalidFormat`] - too short, wrong signature, or an
///   unsupported machine format
///
/// # Examples
///
/// ```rust
/// use vhsb::{Tensor, WriteOptions};
///
/// let x = [0.0, 0.1, 0.2, 0.3];
/// let y = Tensor::column(&[1.0, 2.0, 3.0, 4.0]);
/// vhsb::write("doc_header_demo.vhsb", &x, &y, &WriteOptions::default())?;
///
/// let header = vhsb::read_header("doc_header_demo.vhsb")?;
/// assert!(header.x_stored);
/// assert!(header.x_constant_interval);
/// assert_eq!(header.y_dim, vec![1]);
/// # std::fs::remove_file("doc_header_demo.vhsb").ok();
/// # Ok::<(), vhsb::VhsbError>(())
/// ```
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<VhsbHeader> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VhsbError::FileNotFound(path.display().to_string()));
    }
    let mut file = BufReader::new(File::open(path)?);

    let mut bytes = vec![0u8; HEADER_SIZE as usize];
    file.read_exact(&mut bytes).map_err(|_| {
        VhsbError::InvalidFormat(format!(
            "{} is shorter than a VHSB header",
            path.display()
        ))
    })?;

    VhsbHeader::decode(&bytes)
}

/// Reads the samples whose X values fall in `[x0, x1]`, silently clipping
/// an out-of-range query to the file's sampled interval.
///
/// Equivalent to [`read_range`] with `strict_bounds` false. Returns the
/// selected Y slice shaped `(count, *y_dim)` and the matching X values.
///
/// For constant-interval files the query maps to a byte range in closed
/// form and costs one seek plus one bulk read; irregularly sampled files
/// fall back to a full linear scan with post-decode filtering.
///
/// # Examples
///
/// ```rust
/// use vhsb::{Tensor, WriteOptions};
///
/// let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
/// let y = Tensor::from_rows(&x.iter().map(|&t| vec![t.sin(), t.cos()]).collect::<Vec<_>>())?;
/// vhsb::write("doc_read_demo.vhsb", &x, &y, &WriteOptions::default())?;
///
/// // Mid-file range query.
/// let (y_mid, x_mid) = vhsb::read("doc_read_demo.vhsb", 0.25, 0.50)?;
/// assert_eq!(y_mid.shape(), &[26, 2]);
/// assert!((x_mid[0] - 0.25).abs() < 1e-12);
///
/// // An oversized range clips to the whole file.
/// let (y_all, _) = vhsb::read("doc_read_demo.vhsb", -1e6, 1e6)?;
/// assert_eq!(y_all.shape(), &[100, 2]);
/// # std::fs::remove_file("doc_read_demo.vhsb").ok();
/// # Ok::<(), vhsb::VhsbError>(())
/// ```
pub fn read<P: AsRef<Path>>(path: P, x0: f64, x1: f64) -> Result<(Tensor, Vec<f64>)> {
    read_range(path, x0, x1, false)
}

/// Range read with an explicit out-of-bounds policy.
///
/// With `strict_bounds` set, a query range lying entirely outside the
/// file's sampled interval fails with [`VhsbError::OutOfBounds`] instead of
/// clipping to an empty or partial result. Partial overlap is always
/// clipped; only total misses are strict errors.
///
/// # Errors
///
/// * [`VhsbError::OutOfBounds`] - strict query with no overlap
/// * [`VhsbError::TruncatedFile`] - the trailing bytes are not a whole
///   number of sample records
/// * [`VhsbError::Io`] - underlying read failure
pub fn read_range<P: AsRef<Path>>(
    path: P,
    x0: f64,
    x1: f64,
    strict_bounds: bool,
) -> Result<(Tensor, Vec<f64>)> {
    let path = path.as_ref();
    let header = read_header(path)?;

    let filesize = std::fs::metadata(path)?.len();
    let num_samples = header.num_samples(filesize)?;
    let sample_size = header.sample_size();

    // Refuse to decode a partial trailing record.
    let trailing = filesize.saturating_sub(HEADER_SIZE);
    if sample_size > 0 && trailing % sample_size != 0 {
        return Err(VhsbError::TruncatedFile {
            trailing,
            sample_size,
        });
    }

    if num_samples == 0 {
        return empty_result(&header);
    }

    let mut file = BufReader::new(File::open(path)?);

    // Constant-interval streams support a closed-form time-to-index map;
    // anything else is a full scan.
    let closed_form = header.x_constant_interval && header.x_increment != 0.0;

    let (s0, s1) = if closed_form {
        let n = num_samples as i64;
        let raw0 = point_to_sample(x0, header.x_increment, header.x_start);
        let raw1 = point_to_sample(x1, header.x_increment, header.x_start);

        if strict_bounds {
            let span_end = sample_to_point(n, header.x_increment, header.x_start);
            let (lo, hi) = if header.x_increment > 0.0 {
                (header.x_start, span_end)
            } else {
                (span_end, header.x_start)
            };
            if x1 < lo || x0 > hi {
                return Err(VhsbError::OutOfBounds {
                    x0,
                    x1,
                    start: lo,
                    end: hi,
                });
            }
        }

        let s0 = raw0.clamp(1, n);
        let s1 = raw1.clamp(1, n);
        if (raw0, raw1) != (s0, s1) {
            debug!(
                "query [{}, {}] clipped to samples [{}, {}] of {}",
                x0, x1, s0, s1, n
            );
        }
        (s0, s1)
    } else {
        (1, num_samples as i64)
    };

    if s1 < s0 {
        return empty_result(&header);
    }
    let count = (s1 - s0 + 1) as usize;

    // One seek, one bulk read.
    file.seek(SeekFrom::Start(HEADER_SIZE + (s0 - 1) as u64 * sample_size))?;
    let mut block = vec![0u8; count * sample_size as usize];
    file.read_exact(&mut block)?;

    let values_per_sample = header.values_per_sample();
    let x_width = header.x_format.byte_width();
    let y_width = header.y_format.byte_width();

    let mut xs = Vec::with_capacity(count);
    let mut ys = Vec::with_capacity(count * values_per_sample);

    for (i, record) in block.chunks_exact(sample_size as usize).enumerate() {
        let mut offset = 0;
        let t = if header.x_stored {
            let stored = header.x_format.decode(record)?;
            offset += x_width;
            match header.x_scaling {
                Some(s) => s.inverse(stored),
                None => stored,
            }
        } else {
            sample_to_point(s0 + i as i64, header.x_increment, header.x_start)
        };
        xs.push(t);

        for _ in 0..values_per_sample {
            let stored = header.y_format.decode(&record[offset..])?;
            offset += y_width;
            ys.push(match header.y_scaling {
                Some(s) => s.inverse(stored),
                None => stored,
            });
        }
    }

    // Irregular data was read in full; apply the range filter after
    // decoding the actual X values.
    if !closed_form {
        let mut kept_x = Vec::new();
        let mut kept_y = Vec::new();
        for (i, &t) in xs.iter().enumerate() {
            if t >= x0 && t <= x1 {
                kept_x.push(t);
                kept_y.extend_from_slice(&ys[i * values_per_sample..(i + 1) * values_per_sample]);
            }
        }
        xs = kept_x;
        ys = kept_y;
    }

    let mut shape = vec![xs.len()];
    shape.extend(header.y_dim.iter().map(|&d| d as usize));
    Ok((Tensor::new(shape, ys)?, xs))
}

fn empty_result(header: &VhsbHeader) -> Result<(Tensor, Vec<f64>)> {
    let mut shape = vec![0];
    shape.extend(header.y_dim.iter().map(|&d| d as usize));
    Ok((Tensor::new(shape, Vec::new())?, Vec::new()))
}
