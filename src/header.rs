use crate::error::{Result, VhsbError};
use crate::types::{SampleFormat, SampleType, Scaling};
use crate::utils::{first_line, pad_string_field};
use crate::{HEADER_SIZE, IDENT_SIZE, IDENT_STRING, MACHINE_FORMAT, MAX_DIMENSIONS, UNITS_SIZE};

/// The fixed-layout VHSB file header.
///
/// A header is created once by the writer and never patched afterwards. The
/// sample count is deliberately absent: it is derived from the file size, so
/// `y_dim` holds only the per-sample dimensions (`Y_dim[1:]` in format
/// terms, at most 99 entries).
///
/// # Examples
///
/// ```rust
/// use vhsb::VhsbHeader;
///
/// let header = VhsbHeader {
///     y_dim: vec![2],
///     x_constant_interval: true,
///     x_increment: 0.001,
///     ..VhsbHeader::default()
/// };
///
/// let bytes = header.encode().unwrap();
/// assert_eq!(bytes.len(), 1836);
///
/// let decoded = VhsbHeader::decode(&bytes).unwrap();
/// assert_eq!(decoded.y_dim, vec![2]);
/// // One stored f64 time value plus two f64 channel values.
/// assert_eq!(decoded.sample_size(), 24);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VhsbHeader {
    pub version: u32,
    pub machine_format: String,
    pub x_format: SampleFormat,
    /// Per-sample dimensions of the Y tensor. Empty means scalar samples.
    pub y_dim: Vec<u64>,
    pub y_format: SampleFormat,
    /// Whether an X scalar is physically written in front of each record.
    pub x_stored: bool,
    /// Whether the X axis is uniformly sampled, enabling O(1) range reads.
    pub x_constant_interval: bool,
    pub x_start: f64,
    pub x_increment: f64,
    pub x_units: String,
    pub y_units: String,
    pub x_scaling: Option<Scaling>,
    pub y_scaling: Option<Scaling>,
}

impl Default for VhsbHeader {
    fn default() -> Self {
        VhsbHeader {
            version: 1,
            machine_format: MACHINE_FORMAT.to_string(),
            x_format: SampleFormat::float64(),
            y_dim: vec![1],
            y_format: SampleFormat::float64(),
            x_stored: true,
            x_constant_interval: false,
            x_start: 0.0,
            x_increment: 0.0,
            x_units: String::new(),
            y_units: String::new(),
            x_scaling: None,
            y_scaling: None,
        }
    }
}

impl VhsbHeader {
    /// Serializes the header to its fixed 1836-byte layout.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.x_format.validate()?;
        self.y_format.validate()?;
        if self.y_dim.len() >= MAX_DIMENSIONS {
            return Err(VhsbError::InvalidDimensions(format!(
                "at most {} per-sample dimensions can be stored, got {}",
                MAX_DIMENSIONS - 1,
                self.y_dim.len()
            )));
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);

        pad_string_field(IDENT_STRING, IDENT_SIZE, &mut buf)?;
        buf.extend_from_slice(&self.version.to_le_bytes());
        pad_string_field(&self.machine_format, MACHINE_FORMAT_FIELD, &mut buf)?;

        buf.extend_from_slice(&self.x_format.bits.to_le_bytes());
        buf.extend_from_slice(&self.x_format.sample_type.code().to_le_bytes());

        for &d in &self.y_dim {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        for _ in self.y_dim.len()..MAX_DIMENSIONS {
            buf.extend_from_slice(&0u64.to_le_bytes());
        }

        buf.extend_from_slice(&self.y_format.bits.to_le_bytes());
        buf.extend_from_slice(&self.y_format.sample_type.code().to_le_bytes());

        buf.push(self.x_stored as u8);
        buf.push(self.x_constant_interval as u8);

        self.x_format.encode_into(self.x_start, &mut buf)?;
        self.x_format.encode_into(self.x_increment, &mut buf)?;

        pad_string_field(&self.x_units, UNITS_SIZE, &mut buf)?;
        pad_string_field(&self.y_units, UNITS_SIZE, &mut buf)?;

        buf.push(self.x_scaling.is_some() as u8);
        buf.push(self.y_scaling.is_some() as u8);

        let xs = self.x_scaling.unwrap_or_default();
        let ys = self.y_scaling.unwrap_or_default();
        buf.extend_from_slice(&xs.scale.to_le_bytes());
        buf.extend_from_slice(&xs.offset.to_le_bytes());
        buf.extend_from_slice(&ys.scale.to_le_bytes());
        buf.extend_from_slice(&ys.offset.to_le_bytes());

        // Narrow X formats leave a gap before the data block; pad it out so
        // the header is always exactly 1836 bytes.
        debug_assert!(buf.len() <= HEADER_SIZE as usize);
        buf.resize(HEADER_SIZE as usize, 0);
        Ok(buf)
    }

    /// Parses a header from the first 1836 bytes of a file.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(VhsbError::InvalidFormat(format!(
                "header requires {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let ident = first_line(&bytes[..IDENT_SIZE]);
        if !ident.starts_with(IDENT_PREFIX) {
            return Err(VhsbError::InvalidFormat(format!(
                "identification block does not match a VHSB file: '{}'",
                ident
            )));
        }

        let mut pos = IDENT_SIZE;
        let version = read_u32(bytes, &mut pos);

        let machine_format = first_line(&bytes[pos..pos + MACHINE_FORMAT_FIELD]);
        pos += MACHINE_FORMAT_FIELD;
        if machine_format != MACHINE_FORMAT {
            return Err(VhsbError::InvalidFormat(format!(
                "unsupported machine format '{}'",
                machine_format
            )));
        }

        let x_bits = read_u32(bytes, &mut pos);
        let x_type = SampleType::from_code(read_u16(bytes, &mut pos))?;
        let x_format = SampleFormat::new(x_type, x_bits);
        x_format.validate()?;

        let mut y_dim = Vec::new();
        for _ in 0..MAX_DIMENSIONS {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[pos..pos + 8]);
            pos += 8;
            y_dim.push(u64::from_le_bytes(b));
        }
        // Only the non-zero prefix is meaningful.
        let rank = y_dim.iter().position(|&d| d == 0).unwrap_or(MAX_DIMENSIONS);
        y_dim.truncate(rank);

        let y_bits = read_u32(bytes, &mut pos);
        let y_type = SampleType::from_code(read_u16(bytes, &mut pos))?;
        let y_format = SampleFormat::new(y_type, y_bits);
        y_format.validate()?;

        let x_stored = bytes[pos] != 0;
        let x_constant_interval = bytes[pos + 1] != 0;
        pos += 2;

        let x_start = x_format.decode(&bytes[pos..])?;
        pos += x_format.byte_width();
        let x_increment = x_format.decode(&bytes[pos..])?;
        pos += x_format.byte_width();

        let x_units = first_line(&bytes[pos..pos + UNITS_SIZE]);
        pos += UNITS_SIZE;
        let y_units = first_line(&bytes[pos..pos + UNITS_SIZE]);
        pos += UNITS_SIZE;

        let x_usescale = bytes[pos] != 0;
        let y_usescale = bytes[pos + 1] != 0;
        pos += 2;

        let x_scale = read_f64(bytes, &mut pos);
        let x_offset = read_f64(bytes, &mut pos);
        let y_scale = read_f64(bytes, &mut pos);
        let y_offset = read_f64(bytes, &mut pos);

        Ok(VhsbHeader {
            version,
            machine_format,
            x_format,
            y_dim,
            y_format,
            x_stored,
            x_constant_interval,
            x_start,
            x_increment,
            x_units,
            y_units,
            x_scaling: x_usescale.then(|| Scaling::new(x_scale, x_offset)),
            y_scaling: y_usescale.then(|| Scaling::new(y_scale, y_offset)),
        })
    }

    /// Number of Y values in one sample record.
    pub fn values_per_sample(&self) -> usize {
        self.y_dim.iter().product::<u64>() as usize
    }

    /// Size of one sample record in bytes: the optional X scalar plus the
    /// flattened Y tensor for that sample.
    pub fn sample_size(&self) -> u64 {
        let x_bytes = if self.x_stored {
            self.x_format.byte_width() as u64
        } else {
            0
        };
        x_bytes + self.values_per_sample() as u64 * self.y_format.byte_width() as u64
    }

    /// Sample count derived from the file size; it is never stored.
    pub fn num_samples(&self, filesize: u64) -> Result<u64> {
        let trailing = filesize.saturating_sub(HEADER_SIZE);
        let sample_size = self.sample_size();
        if sample_size == 0 {
            if trailing > 0 {
                return Err(VhsbError::InvalidFormat(
                    "sample size is zero but the file contains sample data".to_string(),
                ));
            }
            return Ok(0);
        }
        Ok(trailing / sample_size)
    }
}

/// The signature that every identification block must start with.
const IDENT_PREFIX: &str = "This is a VHSB file";

/// Width of the machine-format string field.
const MACHINE_FORMAT_FIELD: usize = 256;

fn read_u16(bytes: &[u8], pos: &mut usize) -> u16 {
    let v = u16::from_le_bytes([bytes[*pos], bytes[*pos + 1]]);
    *pos += 2;
    v
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> u32 {
    let v = u32::from_le_bytes([
        bytes[*pos],
        bytes[*pos + 1],
        bytes[*pos + 2],
        bytes[*pos + 3],
    ]);
    *pos += 4;
    v
}

fn read_f64(bytes: &[u8], pos: &mut usize) -> f64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[*pos..*pos + 8]);
    *pos += 8;
    f64::from_le_bytes(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> VhsbHeader {
        VhsbHeader {
            y_dim: vec![4, 2],
            x_constant_interval: true,
            x_start: 10.0,
            x_increment: 0.5,
            x_units: "s".to_string(),
            y_units: "mV".to_string(),
            y_scaling: Some(Scaling::new(0.01, 0.0)),
            ..VhsbHeader::default()
        }
    }

    #[test]
    fn test_encode_length_is_fixed() {
        assert_eq!(sample_header().encode().unwrap().len(), 1836);

        // A 16-bit X format leaves a padding gap but the same total length.
        let narrow = VhsbHeader {
            x_format: SampleFormat::new(SampleType::Int, 16),
            ..VhsbHeader::default()
        };
        assert_eq!(narrow.encode().unwrap().len(), 1836);
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let decoded = VhsbHeader::decode(&header.encode().unwrap()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_dimension_array_trimmed_to_nonzero_prefix() {
        let header = sample_header();
        let decoded = VhsbHeader::decode(&header.encode().unwrap()).unwrap();
        assert_eq!(decoded.y_dim, vec![4, 2]);
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut bytes = sample_header().encode().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            VhsbHeader::decode(&bytes),
            Err(VhsbError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_short_buffer() {
        assert!(VhsbHeader::decode(&[0u8; 100]).is_err());
    }

    #[test]
    fn test_rejects_too_many_dimensions() {
        let header = VhsbHeader {
            y_dim: vec![1; 100],
            ..VhsbHeader::default()
        };
        assert!(header.encode().is_err());
    }

    #[test]
    fn test_sample_geometry() {
        let header = sample_header();
        // 8 bytes stored X + 8 f64 values per sample.
        assert_eq!(header.sample_size(), 8 + 8 * 8);
        assert_eq!(header.num_samples(1836 + 3 * 72).unwrap(), 3);
        assert_eq!(header.num_samples(1836).unwrap(), 0);
    }

    #[test]
    fn test_zero_sample_size_with_data_is_invalid() {
        let header = VhsbHeader {
            x_stored: false,
            y_dim: vec![0],
            ..VhsbHeader::default()
        };
        assert_eq!(header.sample_size(), 0);
        assert!(header.num_samples(2000).is_err());
    }
}
