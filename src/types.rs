use crate::error::{Result, VhsbError};

/// Logical type of a stored scalar.
///
/// The wire code (u16) matches the VHSB header encoding: char=1, uint=2,
/// int=3, float=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Char,
    Uint,
    Int,
    Float,
}

impl SampleType {
    pub fn code(&self) -> u16 {
        match self {
            SampleType::Char => 1,
            SampleType::Uint => 2,
            SampleType::Int => 3,
            SampleType::Float => 4,
        }
    }

    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            1 => Ok(SampleType::Char),
            2 => Ok(SampleType::Uint),
            3 => Ok(SampleType::Int),
            4 => Ok(SampleType::Float),
            _ => Err(VhsbError::UnsupportedSampleType {
                type_code: code,
                bits: 0,
            }),
        }
    }
}

/// A fixed-width binary scalar codec: a (logical type, bit width) pair.
///
/// Values are `f64` in memory and converted to the target representation on
/// encode. All multi-byte values are little-endian, matching the single
/// file-wide byte-order convention of the format.
///
/// # Examples
///
/// ```rust
/// use vhsb::{SampleFormat, SampleType};
///
/// let fmt = SampleFormat::new(SampleType::Float, 64);
/// let mut buf = Vec::new();
/// fmt.encode_into(1.5, &mut buf).unwrap();
/// assert_eq!(buf.len(), 8);
/// assert_eq!(fmt.decode(&buf).unwrap(), 1.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub sample_type: SampleType,
    pub bits: u32,
}

impl SampleFormat {
    pub fn new(sample_type: SampleType, bits: u32) -> Self {
        SampleFormat { sample_type, bits }
    }

    /// Default format for both axes: 64-bit float.
    pub fn float64() -> Self {
        SampleFormat::new(SampleType::Float, 64)
    }

    /// Checks that this (type, width) pair has a defined encoding.
    pub fn validate(&self) -> Result<()> {
        let supported = match self.sample_type {
            SampleType::Char => self.bits == 8,
            SampleType::Uint | SampleType::Int => matches!(self.bits, 8 | 16 | 32 | 64),
            SampleType::Float => matches!(self.bits, 32 | 64),
        };
        if supported {
            Ok(())
        } else {
            Err(VhsbError::UnsupportedSampleType {
                type_code: self.sample_type.code(),
                bits: self.bits,
            })
        }
    }

    /// Width of one encoded scalar in bytes.
    pub fn byte_width(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// Encodes one value, appending exactly `byte_width()` bytes to `out`.
    pub fn encode_into(&self, value: f64, out: &mut Vec<u8>) -> Result<()> {
        match (self.sample_type, self.bits) {
            (SampleType::Char, 8) => out.push(value as u8),
            (SampleType::Uint, 8) => out.push(value as u8),
            (SampleType::Uint, 16) => out.extend_from_slice(&(value as u16).to_le_bytes()),
            (SampleType::Uint, 32) => out.extend_from_slice(&(value as u32).to_le_bytes()),
            (SampleType::Uint, 64) => out.extend_from_slice(&(value as u64).to_le_bytes()),
            (SampleType::Int, 8) => out.extend_from_slice(&(value as i8).to_le_bytes()),
            (SampleType::Int, 16) => out.extend_from_slice(&(value as i16).to_le_bytes()),
            (SampleType::Int, 32) => out.extend_from_slice(&(value as i32).to_le_bytes()),
            (SampleType::Int, 64) => out.extend_from_slice(&(value as i64).to_le_bytes()),
            (SampleType::Float, 32) => out.extend_from_slice(&(value as f32).to_le_bytes()),
            (SampleType::Float, 64) => out.extend_from_slice(&value.to_le_bytes()),
            _ => {
                return Err(VhsbError::UnsupportedSampleType {
                    type_code: self.sample_type.code(),
                    bits: self.bits,
                })
            }
        }
        Ok(())
    }

    /// Decodes one value from the first `byte_width()` bytes of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Result<f64> {
        let w = self.byte_width();
        if bytes.len() < w {
            return Err(VhsbError::InvalidFormat(format!(
                "need {} bytes to decode a sample, got {}",
                w,
                bytes.len()
            )));
        }
        let v = match (self.sample_type, self.bits) {
            (SampleType::Char, 8) => bytes[0] as f64,
            (SampleType::Uint, 8) => bytes[0] as f64,
            (SampleType::Uint, 16) => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            (SampleType::Uint, 32) => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            (SampleType::Uint, 64) => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                u64::from_le_bytes(b) as f64
            }
            (SampleType::Int, 8) => bytes[0] as i8 as f64,
            (SampleType::Int, 16) => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            (SampleType::Int, 32) => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            (SampleType::Int, 64) => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                i64::from_le_bytes(b) as f64
            }
            (SampleType::Float, 32) => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            (SampleType::Float, 64) => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                f64::from_le_bytes(b)
            }
            _ => {
                return Err(VhsbError::UnsupportedSampleType {
                    type_code: self.sample_type.code(),
                    bits: self.bits,
                })
            }
        };
        Ok(v)
    }
}

/// Lossy quantization transform applied around the sample codec.
///
/// Encode stores `raw / scale + offset`; decode recovers
/// `(stored - offset) * scale`. The two are exact inverses in real
/// arithmetic; with an integer sample format the quantization error is
/// bounded by one `scale` unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Scaling {
    pub fn new(scale: f64, offset: f64) -> Self {
        Scaling { scale, offset }
    }

    /// Raw value to stored value.
    pub fn forward(&self, raw: f64) -> f64 {
        raw / self.scale + self.offset
    }

    /// Stored value back to raw value.
    pub fn inverse(&self, stored: f64) -> f64 {
        (stored - self.offset) * self.scale
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling::new(1.0, 0.0)
    }
}

/// A dense row-major tensor of `f64` values.
///
/// The first dimension is the sample count; the remaining dimensions
/// describe the per-sample shape. A plain vector of channel readings is a
/// `(n, 1)` tensor.
///
/// # Examples
///
/// ```rust
/// use vhsb::Tensor;
///
/// let t = Tensor::new(vec![3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// assert_eq!(t.num_samples(), 3);
/// assert_eq!(t.row(1), &[3.0, 4.0]);
///
/// let col = Tensor::column(&[0.5, 1.5]);
/// assert_eq!(col.shape(), &[2, 1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Creates a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        if shape.is_empty() {
            return Err(VhsbError::InvalidDimensions(
                "tensor must have at least one dimension".to_string(),
            ));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(VhsbError::InvalidDimensions(format!(
                "shape {:?} holds {} values but {} were given",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Tensor { shape, data })
    }

    /// A `(values.len(), 1)` single-channel tensor.
    pub fn column(values: &[f64]) -> Self {
        Tensor {
            shape: vec![values.len(), 1],
            data: values.to_vec(),
        }
    }

    /// Builds a `(rows.len(), width)` tensor from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(VhsbError::InvalidDimensions(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            data.extend_from_slice(row);
        }
        Tensor::new(vec![rows.len(), width], data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Length of the first (sample-count) dimension.
    pub fn num_samples(&self) -> usize {
        self.shape[0]
    }

    /// Number of values in one sample record: the product of the
    /// per-sample dimensions.
    pub fn row_len(&self) -> usize {
        self.shape[1..].iter().product()
    }

    /// The flattened values of sample `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        let w = self.row_len();
        &self.data[i * w..(i + 1) * w]
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
