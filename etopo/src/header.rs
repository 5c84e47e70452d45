use crate::{EtopoError, C};
use std::{fs, mem::size_of, path::Path};

/// Width and encoding of a single raster sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    /// `2_BYTE_INTEGER`, the ETOPO1 `.bin` layout.
    I16,
    /// `4_BYTE_FLOAT`, the GridFloat `.flt` layout.
    F32,
}

impl SampleType {
    pub fn size(self) -> usize {
        match self {
            Self::I16 => size_of::<i16>(),
            Self::F32 => size_of::<f32>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `MSBFIRST` or `M`.
    Big,
    /// `LSBFIRST` or `I`.
    Little,
}

/// Parsed `.hdr` sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub ncols: usize,
    pub nrows: usize,

    /// Longitude of the _center_ of the west most column.
    pub xll_center: C,

    /// Latitude of the _center_ of the south most row.
    pub yll_center: C,

    /// Degrees per sample, same on both axes.
    pub cell_size: C,

    pub nodata: Option<f32>,

    pub byte_order: ByteOrder,

    /// `None` when the header doesn't say; resolved from the data
    /// file's length at load time.
    pub sample_type: Option<SampleType>,
}

impl Header {
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, EtopoError> {
        let text = fs::read_to_string(&path)?;
        Self::parse(&text)
            .map_err(|reason| EtopoError::Header(path.as_ref().to_owned(), reason))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut corner = false;
        let mut cell_size = None;
        let mut nodata = None;
        let mut byte_order = ByteOrder::Big;
        let mut sample_type = None;
        let mut nbits = None;
        let mut float = false;

        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                continue;
            };
            let key = key.to_ascii_uppercase();
            let num = || -> Result<C, String> {
                value
                    .parse::<C>()
                    .map_err(|_| format!("non-numeric {key} '{value}'"))
            };
            match key.as_str() {
                "NCOLS" => ncols = Some(parse_count(&key, value)?),
                "NROWS" => nrows = Some(parse_count(&key, value)?),
                "XLLCENTER" => xll = Some(num()?),
                "YLLCENTER" => yll = Some(num()?),
                "XLLCORNER" => {
                    xll = Some(num()?);
                    corner = true;
                }
                "YLLCORNER" => {
                    yll = Some(num()?);
                    corner = true;
                }
                "CELLSIZE" | "XDIM" => cell_size = Some(num()?),
                #[allow(clippy::cast_possible_truncation)]
                "NODATA_VALUE" | "NODATA" => nodata = Some(num()? as f32),
                "BYTEORDER" => {
                    byte_order = match value.to_ascii_uppercase().as_str() {
                        "MSBFIRST" | "M" => ByteOrder::Big,
                        "LSBFIRST" | "I" => ByteOrder::Little,
                        other => return Err(format!("unknown byte order '{other}'")),
                    }
                }
                "NUMBERTYPE" => {
                    sample_type = match value.to_ascii_uppercase().as_str() {
                        "2_BYTE_INTEGER" => Some(SampleType::I16),
                        "4_BYTE_FLOAT" => Some(SampleType::F32),
                        other => return Err(format!("unsupported number type '{other}'")),
                    }
                }
                "NBITS" => nbits = Some(parse_count(&key, value)?),
                "PIXELTYPE" => float = value.eq_ignore_ascii_case("FLOAT"),
                _ => (),
            }
        }

        if sample_type.is_none() {
            sample_type = match (nbits, float) {
                (Some(16), false) => Some(SampleType::I16),
                (Some(32), true) => Some(SampleType::F32),
                (None, _) => None,
                (Some(bits), _) => return Err(format!("unsupported sample width {bits}")),
            };
        }

        let ncols = ncols.ok_or("missing NCOLS")?;
        let nrows = nrows.ok_or("missing NROWS")?;
        if ncols == 0 || nrows == 0 {
            return Err(format!("empty grid {ncols}x{nrows}"));
        }
        let cell_size = cell_size.ok_or("missing CELLSIZE")?;
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(format!("invalid CELLSIZE {cell_size}"));
        }
        let half = if corner { cell_size / 2.0 } else { 0.0 };
        let xll_center = xll.ok_or("missing XLLCENTER/XLLCORNER")? + half;
        let yll_center = yll.ok_or("missing YLLCENTER/YLLCORNER")? + half;

        Ok(Self {
            ncols,
            nrows,
            xll_center,
            yll_center,
            cell_size,
            nodata,
            byte_order,
            sample_type,
        })
    }

    /// Resolves the sample type, falling back to the data file length
    /// when the header is silent.
    pub(crate) fn resolve_sample_type(
        &self,
        data_len: u64,
        data_path: &Path,
    ) -> Result<SampleType, EtopoError> {
        let samples = (self.ncols * self.nrows) as u64;
        let expected = |ty: SampleType| samples * ty.size() as u64;
        match self.sample_type {
            Some(ty) if expected(ty) == data_len => Ok(ty),
            None if expected(SampleType::I16) == data_len => Ok(SampleType::I16),
            None if expected(SampleType::F32) == data_len => Ok(SampleType::F32),
            _ => Err(EtopoError::DataLen(data_len, data_path.to_owned())),
        }
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("invalid {key} '{value}'"))
}
