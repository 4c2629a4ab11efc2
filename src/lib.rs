//! # VHSB Library for Rust
//!
//! A pure Rust library for reading and writing VHSB files, a binary
//! container for time-series data: an independent X (time) axis plus a Y
//! data tensor of one or more channels. The format uses a fixed 1836-byte
//! header and fixed-size sample records, which makes range-restricted
//! random-access reads cheap: a time range on a uniformly sampled file
//! resolves to a byte range in closed form, without loading the file.
//!
//! ## Quick Start
//!
//! ### Writing a file
//!
//! ```rust
//! use vhsb::{Tensor, WriteOptions, Result};
//!
//! fn main() -> Result<()> {
//!     // 100 samples at 10 ms spacing, two channels per sample.
//!     let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
//!     let rows: Vec<Vec<f64>> = x.iter().map(|&t| vec![t.sin(), t.cos()]).collect();
//!     let y = Tensor::from_rows(&rows)?;
//!
//!     let options = WriteOptions {
//!         x_units: "s".to_string(),
//!         y_units: "mV".to_string(),
//!         ..WriteOptions::default()
//!     };
//!     vhsb::write("quickstart_write.vhsb", &x, &y, &options)?;
//!     # std::fs::remove_file("quickstart_write.vhsb").ok();
//!     Ok(())
//! }
//! ```
//!
//! ### Reading a time range
//!
//! ```rust
//! use vhsb::{Tensor, WriteOptions, Result};
//!
//! fn main() -> Result<()> {
//!     # let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
//!     # let y = Tensor::column(&vec![1.0; 100]);
//!     # vhsb::write("quickstart_read.vhsb", &x, &y, &WriteOptions::default())?;
//!     let header = vhsb::read_header("quickstart_read.vhsb")?;
//!     println!("units: '{}' / '{}'", header.x_units, header.y_units);
//!
//!     // Samples with 0.2 <= x <= 0.4; out-of-range queries clip silently.
//!     let (y_slice, x_slice) = vhsb::read("quickstart_read.vhsb", 0.2, 0.4)?;
//!     assert_eq!(y_slice.shape()[0], x_slice.len());
//!     # std::fs::remove_file("quickstart_read.vhsb").ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Quantized storage
//!
//! Both axes can be quantized to a narrower integer format through a
//! scale/offset transform; the reader undoes it transparently:
//!
//! ```rust
//! use vhsb::{SampleFormat, SampleType, Scaling, Tensor, WriteOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
//!     let y = Tensor::column(&x.iter().map(|&t| t * 0.125).collect::<Vec<_>>());
//!
//!     let options = WriteOptions {
//!         y_format: SampleFormat::new(SampleType::Int, 16),
//!         // stored = raw / scale + offset; one count per 0.125 units
//!         y_scaling: Some(Scaling::new(0.125, 0.0)),
//!         ..WriteOptions::default()
//!     };
//!     vhsb::write("quickstart_scaled.vhsb", &x, &y, &options)?;
//!
//!     let (y_read, _) = vhsb::read("quickstart_scaled.vhsb", 0.0, 49.0)?;
//!     assert_eq!(y_read.data()[8], 1.0);
//!     # std::fs::remove_file("quickstart_scaled.vhsb").ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency model
//!
//! Writers coordinate through an advisory sentinel lock file at
//! `path + "-lock"` (see [`lock`]); readers do not synchronize at all and
//! expect to run after a write has completed. There is no read-side
//! consistency guarantee against an in-flight writer.

pub mod error;
pub mod header;
pub mod lock;
pub mod reader;
pub mod types;
pub mod utils;
pub mod writer;

// Re-export main types for convenience
pub use error::{Result, VhsbError};
pub use header::VhsbHeader;
pub use lock::{FileLock, LockService};
pub use reader::{read, read_header, read_range};
pub use types::{SampleFormat, SampleType, Scaling, Tensor};
pub use writer::{write, write_with_lock, WriteOptions};

/// Total size of the fixed-layout file header in bytes.
pub const HEADER_SIZE: u64 = 1836;

/// Size of the leading identification block.
pub const IDENT_SIZE: usize = 200;

/// Number of dimension slots in the header; the last usable count is one
/// less because the sample-count dimension is never persisted.
pub const MAX_DIMENSIONS: usize = 100;

/// Signature written at the start of every file.
pub const IDENT_STRING: &str = "This is a VHSB file, http://github.com/VH-Lab";

/// The single supported byte-order tag.
pub const MACHINE_FORMAT: &str = "little-endian";

/// Width of each unit-string field in the header.
pub const UNITS_SIZE: usize = 256;

/// Largest second difference of the X axis (in X units) still considered
/// uniformly sampled.
pub const CONSTANT_INTERVAL_TOLERANCE: f64 = 1e-7;

/// Library version
///
/// ```rust
/// let version = vhsb::version();
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
