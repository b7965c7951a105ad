use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use ndarray::Array2;

/// The fields of a simplified BOV (Brick of Values) descriptor the
/// plotter consumes: the raw data file named on line 2 and the grid
/// dimensions from line 3. Everything else in the descriptor is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BovHeader {
    pub raw_file: PathBuf,
    pub width: usize,
    pub height: usize,
}

/// Read a BOV descriptor.
///
/// Line 2 names the raw file in its second whitespace token, line 3
/// carries the grid width and height in its second and third tokens.
pub fn read_header(path: impl AsRef<Path>) -> Result<BovHeader> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read header {}", path.display()))?;
    let lines: Vec<&str> = text.lines().collect();

    let raw_file = lines
        .get(1)
        .and_then(|line| line.split_whitespace().nth(1))
        .with_context(|| format!("{}: line 2 does not name a raw data file", path.display()))?;

    let mut dims = lines
        .get(2)
        .map(|line| line.split_whitespace().skip(1))
        .with_context(|| format!("{}: line 3 does not carry grid dimensions", path.display()))?;

    let width = parse_dim(dims.next(), path, "width")?;
    let height = parse_dim(dims.next(), path, "height")?;

    Ok(BovHeader {
        raw_file: PathBuf::from(raw_file),
        width,
        height,
    })
}

fn parse_dim(token: Option<&str>, path: &Path, name: &str) -> Result<usize> {
    token
        .with_context(|| format!("{}: line 3 is missing the {}", path.display(), name))?
        .parse()
        .with_context(|| format!("{}: bad {} on line 3", path.display(), name))
}

/// Read `count` native-endian doubles from a raw data file. Trailing
/// bytes beyond `count` values are ignored.
pub fn read_raw(path: impl AsRef<Path>, count: usize) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("failed to read raw data {}", path.display()))?;
    let wanted = count * mem::size_of::<f64>();
    ensure!(
        bytes.len() >= wanted,
        "{}: holds {} doubles, header promises {}",
        path.display(),
        bytes.len() / mem::size_of::<f64>(),
        count
    );
    Ok(bytemuck::pod_collect_to_vec(&bytes[..wanted]))
}

/// Load the field a header describes, reshaped row-major to
/// `(height, width)`.
pub fn read_field(header: &BovHeader) -> Result<Array2<f64>> {
    let data = read_raw(&header.raw_file, header.width * header.height)?;
    Array2::from_shape_vec((header.height, header.width), data)
        .context("field does not match header dimensions")
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;

    fn scratch(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_read_header() {
        let path = scratch("bovplot_header.bov");
        fs::write(&path, "TIME: 0.0\nDATA_FILE: output.bin\nDATA_SIZE: 4 5 1\n").unwrap();
        let header = read_header(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(header.raw_file, PathBuf::from("output.bin"));
        assert_eq!(header.width, 4);
        assert_eq!(header.height, 5);
    }

    #[test]
    fn test_read_header_truncated() {
        let path = scratch("bovplot_header_short.bov");
        fs::write(&path, "TIME: 0.0\n").unwrap();
        assert!(read_header(&path).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_header_bad_dimension() {
        let path = scratch("bovplot_header_bad.bov");
        fs::write(&path, "TIME: 0.0\nDATA_FILE: output.bin\nDATA_SIZE: x 5 1\n").unwrap();
        assert!(read_header(&path).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_raw_roundtrip() {
        let path = scratch("bovplot_raw.bin");
        let values = [0.0f64, 0.25, 0.5, 0.75, 1.0, 0.125];
        fs::write(&path, bytemuck::cast_slice::<f64, u8>(&values)).unwrap();
        let data = read_raw(&path, values.len()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(data, values);
    }

    #[test]
    fn test_read_raw_short_file() {
        let path = scratch("bovplot_raw_short.bin");
        let values = [1.0f64, 2.0, 3.0];
        fs::write(&path, bytemuck::cast_slice::<f64, u8>(&values)).unwrap();
        assert!(read_raw(&path, 6).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_field_shape() {
        let path = scratch("bovplot_field.bin");
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        fs::write(&path, bytemuck::cast_slice::<f64, u8>(&values)).unwrap();
        let header = BovHeader {
            raw_file: path.clone(),
            width: 4,
            height: 3,
        };
        let field = read_field(&header).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(field.dim(), (3, 4));
        assert_eq!(field[[0, 3]], 3.0);
        assert_eq!(field[[2, 0]], 8.0);
    }
}
