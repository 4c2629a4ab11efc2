use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::error::{Result, VhsbError};
use crate::header::VhsbHeader;
use crate::lock::{FileLock, LockService};
use crate::types::{SampleFormat, Scaling, Tensor};
use crate::utils::median;
use crate::CONSTANT_INTERVAL_TOLERANCE;

/// Write-time configuration for a VHSB file.
///
/// The defaults store both axes as 64-bit floats with no quantization,
/// taking the advisory file lock with a budget of 30 one-second polls and
/// a one-hour lock expiration.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub x_units: String,
    pub y_units: String,
    pub x_format: SampleFormat,
    pub y_format: SampleFormat,
    /// Quantization applied to stored X values; `None` stores raw values.
    pub x_scaling: Option<Scaling>,
    /// Quantization applied to stored Y values; `None` stores raw values.
    pub y_scaling: Option<Scaling>,
    /// Whether to guard the write with the advisory lock at `path + "-lock"`.
    pub use_filelock: bool,
    pub lock_retries: u32,
    pub lock_expiration: Duration,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            x_units: String::new(),
            y_units: String::new(),
            x_format: SampleFormat::float64(),
            y_format: SampleFormat::float64(),
            x_scaling: None,
            y_scaling: None,
            use_filelock: true,
            lock_retries: 30,
            lock_expiration: Duration::from_secs(3600),
        }
    }
}

/// Writes a complete VHSB file in one shot.
///
/// `x` carries the time axis; `y`'s first dimension must have the same
/// length (rows correspond to samples). The header is derived from the
/// data: `X_start` is `x[0]`, `X_increment` is the median step, and the
/// constant-interval flag is set when the steps are uniform to within
/// 1e-7. X is always physically stored per sample, even for uniformly
/// sampled data: a deliberate space-for-simplicity tradeoff that keeps
/// the read path identical for both kinds of streams.
///
/// The advisory lock at `path + "-lock"` is held for the duration of the
/// write (unless `options.use_filelock` is false) and released on every
/// exit path.
///
/// # Errors
///
/// * [`VhsbError::ShapeMismatch`] - `x` and `y` disagree on sample count
/// * [`VhsbError::UnsupportedSampleType`] - invalid (type, width) pair
/// * [`VhsbError::LockUnavailable`] - lock could not be acquired
/// * [`VhsbError::Io`] - underlying write failure (lock still released)
///
/// # Examples
///
/// ```rust
/// use vhsb::{Tensor, WriteOptions};
///
/// let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
/// let y = Tensor::column(&[1.0; 10]);
///
/// vhsb::write("doc_write_demo.vhsb", &x, &y, &WriteOptions::default())?;
///
/// let (y_read, x_read) = vhsb::read("doc_write_demo.vhsb", 0.0, 10.0)?;
/// assert_eq!(y_read.shape(), &[10, 1]);
/// assert_eq!(x_read.len(), 10);
/// # std::fs::remove_file("doc_write_demo.vhsb").ok();
/// # Ok::<(), vhsb::VhsbError>(())
/// ```
pub fn write<P: AsRef<Path>>(
    path: P,
    x: &[f64],
    y: &Tensor,
    options: &WriteOptions,
) -> Result<()> {
    if options.use_filelock {
        write_with_lock(path, x, y, options, &FileLock::new())
    } else {
        write_unlocked(path.as_ref(), x, y, options)
    }
}

/// Like [`write`], but coordinating through a caller-supplied lock service.
///
/// Acquires the lock before any file mutation and calls `release` exactly
/// once for the acquisition, whether the write succeeds or fails.
pub fn write_with_lock<P: AsRef<Path>>(
    path: P,
    x: &[f64],
    y: &Tensor,
    options: &WriteOptions,
    lock: &dyn LockService,
) -> Result<()> {
    let path = path.as_ref();
    let lock_path = lock_sentinel_path(path);

    let key = lock
        .acquire(&lock_path, options.lock_retries, options.lock_expiration)?
        .ok_or_else(|| VhsbError::LockUnavailable(lock_path.display().to_string()))?;

    let outcome = write_unlocked(path, x, y, options);
    let released = lock.release(&lock_path, &key);

    // A write failure is the caller's primary concern; release trouble only
    // surfaces when the write itself went through.
    outcome?;
    if !released? {
        return Err(VhsbError::LockUnavailable(format!(
            "lock {} was taken over before release",
            lock_path.display()
        )));
    }
    Ok(())
}

/// The lock sentinel lives next to the data file, named `<file>-lock`.
fn lock_sentinel_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-lock");
    PathBuf::from(name)
}

fn write_unlocked(path: &Path, x: &[f64], y: &Tensor, options: &WriteOptions) -> Result<()> {
    if x.len() != y.num_samples() {
        return Err(VhsbError::ShapeMismatch {
            x_len: x.len(),
            y_len: y.num_samples(),
        });
    }
    options.x_format.validate()?;
    options.y_format.validate()?;

    // Timing parameters come from the raw X axis, before any quantization.
    let (x_start, x_increment, constant_interval) = derive_timing(x);

    let header = VhsbHeader {
        x_format: options.x_format,
        y_dim: y.shape()[1..].iter().map(|&d| d as u64).collect(),
        y_format: options.y_format,
        x_stored: true,
        x_constant_interval: constant_interval,
        x_start,
        x_increment,
        x_units: options.x_units.clone(),
        y_units: options.y_units.clone(),
        x_scaling: options.x_scaling,
        y_scaling: options.y_scaling,
        ..VhsbHeader::default()
    };

    let header_bytes = header.encode()?;

    let mut records =
        Vec::with_capacity(x.len() * header.sample_size() as usize);
    for (i, &t) in x.iter().enumerate() {
        let stored_t = match options.x_scaling {
            Some(s) => s.forward(t),
            None => t,
        };
        options.x_format.encode_into(stored_t, &mut records)?;
        for &v in y.row(i) {
            let stored_v = match options.y_scaling {
                Some(s) => s.forward(v),
                None => v,
            };
            options.y_format.encode_into(stored_v, &mut records)?;
        }
    }

    debug!(
        "writing {} samples ({} bytes) to {}",
        x.len(),
        records.len(),
        path.display()
    );

    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    out.write_all(&header_bytes)?;
    out.write_all(&records)?;
    out.flush()?;
    Ok(())
}

/// Derives `(X_start, X_increment, X_constantinterval)` from the time axis.
///
/// The increment is the median step, which tolerates a few irregular gaps.
/// The stream counts as constant-interval when the largest second
/// difference of X stays below the fixed tolerance; with fewer than three
/// samples there is no second difference and a pair is trivially uniform.
fn derive_timing(x: &[f64]) -> (f64, f64, bool) {
    if x.is_empty() {
        return (0.0, 0.0, false);
    }
    let start = x[0];
    if x.len() == 1 {
        return (start, 0.0, false);
    }

    let diffs: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let increment = median(&diffs);

    let max_second_diff = diffs
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0f64, f64::max);

    (start, increment, max_second_diff < CONSTANT_INTERVAL_TOLERANCE)
}
