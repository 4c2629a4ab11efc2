use std::path::PathBuf;

use tempfile::TempDir;
use vhsb::{
    read, read_header, read_range, write, SampleFormat, SampleType, Scaling, Tensor, VhsbError,
    WriteOptions,
};

fn test_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// Lock-free options: the lock contract has its own test file, and skipping
// the sentinel keeps these tests independent of timing.
fn plain_options() -> WriteOptions {
    WriteOptions {
        use_filelock: false,
        ..WriteOptions::default()
    }
}

#[test]
fn test_concrete_scenario_ten_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "ones.vhsb");

    // X = [0.0, 0.1, ..., 0.9], Y = ones((10, 1)).
    let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
    let y = Tensor::column(&[1.0; 10]);
    write(&path, &x, &y, &plain_options()).unwrap();

    let (y_read, x_read) = read(&path, 0.0, 10.0).unwrap();
    assert_eq!(y_read.shape(), &[10, 1]);
    assert!(y_read.data().iter().all(|&v| v == 1.0));
    assert_eq!(x_read.len(), 10);
    for (i, &t) in x_read.iter().enumerate() {
        assert!((t - i as f64 * 0.1).abs() < 1e-9);
    }
}

#[test]
fn test_round_trip_preserves_y_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "roundtrip.vhsb");

    let x: Vec<f64> = (0..64).map(|i| 5.0 + i as f64 * 0.25).collect();
    let rows: Vec<Vec<f64>> = x
        .iter()
        .map(|&t| vec![t.sin(), t.cos(), t * t])
        .collect();
    let y = Tensor::from_rows(&rows).unwrap();

    write(&path, &x, &y, &plain_options()).unwrap();
    let (y_read, x_read) = read(&path, x[0], x[x.len() - 1]).unwrap();

    // Unscaled f64 storage is bit-exact both ways.
    assert_eq!(y_read, y);
    assert_eq!(x_read, x);
}

#[test]
fn test_shape_integrity_two_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "shape.vhsb");

    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, -(i as f64)]).collect();
    write(&path, &x, &Tensor::from_rows(&rows).unwrap(), &plain_options()).unwrap();

    let (y_read, _) = read(&path, 0.0, 9.0).unwrap();
    assert_eq!(y_read.shape(), &[10, 2]);
    assert_eq!(y_read.row(3), &[3.0, -3.0]);
}

#[test]
fn test_constant_interval_detection() {
    let dir = tempfile::tempdir().unwrap();

    let uniform: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let path = test_path(&dir, "uniform.vhsb");
    write(&path, &uniform, &Tensor::column(&[0.0; 100]), &plain_options()).unwrap();
    assert!(read_header(&path).unwrap().x_constant_interval);

    let mut gapped = uniform.clone();
    for v in gapped.iter_mut().skip(50) {
        *v += 3.0; // one irregular gap at sample 50
    }
    let path = test_path(&dir, "gapped.vhsb");
    write(&path, &gapped, &Tensor::column(&[0.0; 100]), &plain_options()).unwrap();
    assert!(!read_header(&path).unwrap().x_constant_interval);
}

#[test]
fn test_range_clipping_and_strict_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "clipping.vhsb");

    let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
    write(&path, &x, &Tensor::column(&x), &plain_options()).unwrap();

    // A wildly oversized query clips to the full file.
    let (y_all, x_all) = read(&path, -1000.0, 1000.0).unwrap();
    assert_eq!(y_all.shape(), &[100, 1]);
    assert_eq!(x_all.len(), 100);

    // Partial overlap clips even in strict mode.
    let (y_tail, _) = read_range(&path, 95.0, 1000.0, true).unwrap();
    assert_eq!(y_tail.shape(), &[5, 1]);

    // Entirely outside the sampled interval: strict errors, lenient clips.
    let err = read_range(&path, 500.0, 1000.0, true).unwrap_err();
    assert!(matches!(err, VhsbError::OutOfBounds { .. }));
    let (y_none, x_none) = read(&path, 500.0, 1000.0).unwrap();
    assert_eq!(y_none.shape(), &[1, 1]); // clips to the last sample
    assert_eq!(x_none, vec![99.0]);
}

#[test]
fn test_mid_file_range_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "midrange.vhsb");

    let x: Vec<f64> = (0..1000).map(|i| i as f64 * 0.001).collect();
    write(&path, &x, &Tensor::column(&x), &plain_options()).unwrap();

    let (y_mid, x_mid) = read(&path, 0.250, 0.500).unwrap();
    assert_eq!(x_mid.len(), 251);
    assert!((x_mid[0] - 0.250).abs() < 1e-9);
    assert!((x_mid[250] - 0.500).abs() < 1e-9);
    assert_eq!(y_mid.shape(), &[251, 1]);
}

#[test]
fn test_irregular_sampling_linear_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "irregular.vhsb");

    // Irregular gaps force the scan path; filtering happens on decoded X.
    let x = vec![0.0, 0.1, 0.35, 0.5, 1.7, 2.0, 5.0];
    let y = Tensor::column(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
    write(&path, &x, &y, &plain_options()).unwrap();
    assert!(!read_header(&path).unwrap().x_constant_interval);

    let (y_read, x_read) = read(&path, 0.3, 2.0).unwrap();
    assert_eq!(x_read, vec![0.35, 0.5, 1.7, 2.0]);
    assert_eq!(y_read.data(), &[12.0, 13.0, 14.0, 15.0]);

    // A range matching nothing comes back empty, not as an error.
    let (y_none, x_none) = read(&path, 2.5, 4.0).unwrap();
    assert_eq!(y_none.shape(), &[0, 1]);
    assert!(x_none.is_empty());
}

#[test]
fn test_single_sample_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "single.vhsb");

    write(&path, &[7.5], &Tensor::column(&[42.0]), &plain_options()).unwrap();

    let header = read_header(&path).unwrap();
    assert!(!header.x_constant_interval);
    assert_eq!(header.x_start, 7.5);
    assert_eq!(header.x_increment, 0.0);

    let (y_read, x_read) = read(&path, 7.5, 7.5).unwrap();
    assert_eq!(x_read, vec![7.5]);
    assert_eq!(y_read.data(), &[42.0]);
}

#[test]
fn test_empty_write_reads_back_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "empty.vhsb");

    let y = Tensor::new(vec![0, 1], Vec::new()).unwrap();
    write(&path, &[], &y, &plain_options()).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 1836);

    let (y_read, x_read) = read(&path, 0.0, 1.0).unwrap();
    assert_eq!(y_read.shape(), &[0, 1]);
    assert!(x_read.is_empty());
}

#[test]
fn test_header_fields_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "fields.vhsb");

    let options = WriteOptions {
        x_units: "seconds".to_string(),
        y_units: "microvolts".to_string(),
        use_filelock: false,
        ..WriteOptions::default()
    };
    let x: Vec<f64> = (0..20).map(|i| 100.0 + i as f64 * 0.5).collect();
    write(&path, &x, &Tensor::column(&x), &options).unwrap();

    let header = read_header(&path).unwrap();
    assert_eq!(header.version, 1);
    assert_eq!(header.machine_format, "little-endian");
    assert_eq!(header.x_units, "seconds");
    assert_eq!(header.y_units, "microvolts");
    assert!(header.x_stored);
    assert!(header.x_constant_interval);
    assert_eq!(header.x_start, 100.0);
    assert_eq!(header.x_increment, 0.5);
    assert_eq!(header.y_dim, vec![1]);
    assert_eq!(header.x_format, SampleFormat::float64());
}

#[test]
fn test_scaled_int16_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "scaled.vhsb");

    let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let values: Vec<f64> = (0..100).map(|i| i as f64 * 0.125 - 4.0).collect();
    let options = WriteOptions {
        y_format: SampleFormat::new(SampleType::Int, 16),
        y_scaling: Some(Scaling::new(0.125, 0.0)),
        use_filelock: false,
        ..WriteOptions::default()
    };
    write(&path, &x, &Tensor::column(&values), &options).unwrap();

    // The scaled file is a quarter of the f64 size per Y value.
    let header = read_header(&path).unwrap();
    assert_eq!(header.sample_size(), 8 + 2);
    assert_eq!(header.y_scaling, Some(Scaling::new(0.125, 0.0)));

    let (y_read, _) = read(&path, 0.0, 99.0).unwrap();
    for (got, want) in y_read.data().iter().zip(&values) {
        // Values are exact multiples of the scale, so no quantization loss.
        assert_eq!(got, want);
    }
}

#[test]
fn test_truncated_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "truncated.vhsb");

    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    write(&path, &x, &Tensor::column(&x), &plain_options()).unwrap();

    // Chop off half of the final record.
    let full = std::fs::metadata(&path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(full - 7).unwrap();
    drop(file);

    let err = read(&path, 0.0, 9.0).unwrap_err();
    assert!(matches!(err, VhsbError::TruncatedFile { .. }));
}

#[test]
fn test_read_header_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_header(test_path(&dir, "nope.vhsb")).unwrap_err();
    assert!(matches!(err, VhsbError::FileNotFound(_)));
}

#[test]
fn test_read_header_rejects_foreign_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "foreign.bin");
    std::fs::write(&path, vec![0x55u8; 4000]).unwrap();
    let err = read_header(&path).unwrap_err();
    assert!(matches!(err, VhsbError::InvalidFormat(_)));

    let short = test_path(&dir, "short.bin");
    std::fs::write(&short, b"This is a VHSB file, but far too short").unwrap();
    assert!(matches!(
        read_header(&short).unwrap_err(),
        VhsbError::InvalidFormat(_)
    ));
}

#[test]
fn test_x_not_stored_is_reconstructed() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "no_x.vhsb");

    // Files from writers that omit the X scalar carry only Y per record;
    // the reader rebuilds X from the header's start and increment.
    let header = vhsb::VhsbHeader {
        x_stored: false,
        x_constant_interval: true,
        x_start: 0.0,
        x_increment: 0.5,
        y_dim: vec![1],
        ..vhsb::VhsbHeader::default()
    };
    let mut bytes = header.encode().unwrap();
    for v in [10.0f64, 11.0, 12.0, 13.0, 14.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    std::fs::write(&path, &bytes).unwrap();

    let parsed = read_header(&path).unwrap();
    assert!(!parsed.x_stored);
    assert_eq!(parsed.sample_size(), 8); // Y only, no time scalar

    let (y_read, x_read) = read(&path, 0.0, 10.0).unwrap();
    assert_eq!(x_read, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    assert_eq!(y_read.data(), &[10.0, 11.0, 12.0, 13.0, 14.0]);

    // A sub-range still maps through the closed form.
    let (y_mid, x_mid) = read(&path, 0.5, 1.5).unwrap();
    assert_eq!(x_mid, vec![0.5, 1.0, 1.5]);
    assert_eq!(y_mid.data(), &[11.0, 12.0, 13.0]);
}

#[test]
fn test_scaled_uint16_x_axis() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "scaled_x.vhsb");

    // Times 0, 2, .., 38 quantize to u16 counts of 2 time units each.
    let x: Vec<f64> = (0..20).map(|i| i as f64 * 2.0).collect();
    let options = WriteOptions {
        x_format: SampleFormat::new(SampleType::Uint, 16),
        x_scaling: Some(Scaling::new(2.0, 0.0)),
        use_filelock: false,
        ..WriteOptions::default()
    };
    write(&path, &x, &Tensor::column(&x), &options).unwrap();

    let header = read_header(&path).unwrap();
    assert_eq!(header.sample_size(), 2 + 8);
    assert_eq!(header.x_scaling, Some(Scaling::new(2.0, 0.0)));
    // Start and increment stay in raw time units.
    assert_eq!(header.x_start, 0.0);
    assert_eq!(header.x_increment, 2.0);
    assert!(header.x_constant_interval);

    // The inverse transform recovers the raw times exactly.
    let (_, x_all) = read(&path, 0.0, 38.0).unwrap();
    assert_eq!(x_all, x);

    // Range queries are posed in raw units as well.
    let (y_mid, x_mid) = read(&path, 10.0, 20.0).unwrap();
    assert_eq!(x_mid, vec![10.0, 12.0, 14.0, 16.0, 18.0, 20.0]);
    assert_eq!(y_mid.shape(), &[6, 1]);
}

#[test]
fn test_rank_three_tensor() {
    let dir = tempfile::tempdir().unwrap();
    let path = test_path(&dir, "rank3.vhsb");

    // 6 samples of 2x3 matrices.
    let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
    let data: Vec<f64> = (0..36).map(|i| i as f64).collect();
    let y = Tensor::new(vec![6, 2, 3], data).unwrap();
    write(&path, &x, &y, &plain_options()).unwrap();

    let header = read_header(&path).unwrap();
    assert_eq!(header.y_dim, vec![2, 3]);
    assert_eq!(header.values_per_sample(), 6);

    let (y_read, _) = read(&path, 2.0, 4.0).unwrap();
    assert_eq!(y_read.shape(), &[3, 2, 3]);
    // Sample 2 starts at flat index 12.
    assert_eq!(y_read.row(0), &[12.0, 13.0, 14.0, 15.0, 16.0, 17.0]);
}
