//! ESRI-style gridded elevation rasters (`.hdr` + `.bin`/`.flt`).
//!
//! This is the layout ETOPO1 and GEBCO grids are commonly exported
//! in: a plain-text header sidecar describing the grid, and a raw
//! file of row-major samples with the north most row first.
//!
//! # References
//!
//! 1. [ETOPO1 Global Relief Model](https://www.ncei.noaa.gov/products/etopo-global-relief-model)
//! 1. [ESRI BIL/GridFloat header](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/bil-bip-and-bsq-raster-files.htm)

mod error;
mod header;

pub use crate::{
    error::EtopoError,
    header::{ByteOrder, Header, SampleType},
};
use byteorder::{BigEndian as BE, ByteOrder as _, LittleEndian as LE, ReadBytesExt};
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

/// Base floating point type used for all coordinates.
pub type C = f64;

/// How to hold raster samples.
///
/// Whole-globe 1 arc-minute grids are several hundred megabytes, so
/// memory mapping is usually the better choice for servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterMode {
    /// Parse samples and load into memory.
    InMem,

    /// Memory map file contents.
    MemMap,
}

pub struct Raster {
    header: Header,

    /// Center of the north east most sample.
    ne_corner_center: Coord<C>,

    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[f32]>),
    MemMap {
        raw: Mmap,
        sample_type: SampleType,
        byte_order: ByteOrder,
    },
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap {
                raw,
                sample_type,
                byte_order,
            } => {
                let start = index * sample_type.size();
                let bytes = &raw[start..start + sample_type.size()];
                match (sample_type, byte_order) {
                    (SampleType::I16, ByteOrder::Big) => f32::from(BE::read_i16(bytes)),
                    (SampleType::I16, ByteOrder::Little) => f32::from(LE::read_i16(bytes)),
                    (SampleType::F32, ByteOrder::Big) => BE::read_f32(bytes),
                    (SampleType::F32, ByteOrder::Little) => LE::read_f32(bytes),
                }
            }
        }
    }
}

impl Raster {
    /// Returns a Raster read into memory from the sample file at
    /// `path`; the header is expected alongside it with an `.hdr`
    /// extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EtopoError> {
        let (header, sample_type) = open_header(path.as_ref())?;
        let count = header.ncols * header.nrows;
        let mut rdr = BufReader::new(File::open(path)?);
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            samples.push(read_sample(&mut rdr, sample_type, header.byte_order)?);
        }
        Ok(Self::new(header, SampleStore::InMem(samples.into_boxed_slice())))
    }

    /// Returns a Raster using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, EtopoError> {
        let (header, sample_type) = open_header(path.as_ref())?;
        let file = File::open(path)?;
        let raw = unsafe { Mmap::map(&file)? };
        let byte_order = header.byte_order;
        Ok(Self::new(
            header,
            SampleStore::MemMap {
                raw,
                sample_type,
                byte_order,
            },
        ))
    }

    pub fn open<P: AsRef<Path>>(path: P, mode: RasterMode) -> Result<Self, EtopoError> {
        match mode {
            RasterMode::InMem => Self::load(path),
            RasterMode::MemMap => Self::memmap(path),
        }
    }

    /// Returns a Raster over samples already in memory, ordered like
    /// the on-disk layout (north most row first).
    ///
    /// # Panics
    ///
    /// If `samples.len()` doesn't match the header's dimensions.
    pub fn from_samples(header: Header, samples: Vec<f32>) -> Self {
        assert_eq!(samples.len(), header.ncols * header.nrows);
        Self::new(header, SampleStore::InMem(samples.into_boxed_slice()))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.header.ncols, self.header.nrows)
    }

    /// Degrees per sample.
    pub fn resolution(&self) -> C {
        self.header.cell_size
    }

    /// Center of the south west most sample.
    pub fn sw_corner_center(&self) -> Coord<C> {
        Coord {
            x: self.header.xll_center,
            y: self.header.yll_center,
        }
    }

    pub fn ne_corner_center(&self) -> Coord<C> {
        self.ne_corner_center
    }

    /// Row center latitudes, south to north.
    #[allow(clippy::cast_precision_loss)]
    pub fn latitudes(&self) -> Vec<C> {
        (0..self.header.nrows)
            .map(|y| self.header.yll_center + y as C * self.header.cell_size)
            .collect()
    }

    /// Column center longitudes, west to east.
    #[allow(clippy::cast_precision_loss)]
    pub fn longitudes(&self) -> Vec<C> {
        (0..self.header.ncols)
            .map(|x| self.header.xll_center + x as C * self.header.cell_size)
            .collect()
    }

    /// Returns the sample at column `x`, row `y` counted from the
    /// south, or `None` if out of bounds or marked as no-data.
    pub fn get_xy(&self, (x, y): (usize, usize)) -> Option<f32> {
        if x < self.header.ncols && y < self.header.nrows {
            let sample = self.samples.get_unchecked(self.xy_to_linear_index((x, y)));
            self.valid(sample)
        } else {
            None
        }
    }

    /// Returns the sample nearest the given geo coordinates.
    #[allow(clippy::cast_sign_loss)]
    pub fn get(&self, coord: Coord<C>) -> Option<f32> {
        let (x, y) = self.coord_to_xy(coord);
        if x >= 0 && y >= 0 {
            self.get_xy((x as usize, y as usize))
        } else {
            None
        }
    }
}

/// Private API
impl Raster {
    fn new(header: Header, samples: SampleStore) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let ne_corner_center = Coord {
            x: header.xll_center + (header.ncols - 1) as C * header.cell_size,
            y: header.yll_center + (header.nrows - 1) as C * header.cell_size,
        };
        Self {
            header,
            ne_corner_center,
            samples,
        }
    }

    fn valid(&self, sample: f32) -> Option<f32> {
        match self.header.nodata {
            _ if sample.is_nan() => None,
            Some(nodata) if sample == nodata => None,
            _ => Some(sample),
        }
    }

    fn coord_to_xy(&self, coord: Coord<C>) -> (isize, isize) {
        let res = self.header.cell_size;
        #[allow(clippy::cast_possible_truncation)]
        let x = ((coord.x - self.header.xll_center) / res).round() as isize;
        #[allow(clippy::cast_possible_truncation)]
        let y = ((coord.y - self.header.yll_center) / res).round() as isize;
        (x, y)
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        self.header.ncols * (self.header.nrows - y - 1) + x
    }
}

fn header_path(data_path: &Path) -> PathBuf {
    data_path.with_extension("hdr")
}

fn open_header(data_path: &Path) -> Result<(Header, SampleType), EtopoError> {
    let header = Header::parse_file(header_path(data_path))?;
    let data_len = data_path.metadata()?.len();
    let sample_type = header.resolve_sample_type(data_len, data_path)?;
    Ok((header, sample_type))
}

fn read_sample<R: Read>(
    rdr: &mut R,
    sample_type: SampleType,
    byte_order: ByteOrder,
) -> Result<f32, EtopoError> {
    Ok(match (sample_type, byte_order) {
        (SampleType::I16, ByteOrder::Big) => f32::from(rdr.read_i16::<BE>()?),
        (SampleType::I16, ByteOrder::Little) => f32::from(rdr.read_i16::<LE>()?),
        (SampleType::F32, ByteOrder::Big) => rdr.read_f32::<BE>()?,
        (SampleType::F32, ByteOrder::Little) => rdr.read_f32::<LE>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::{Coord, EtopoError, Raster, RasterMode};
    use byteorder::{LittleEndian as LE, WriteBytesExt};
    use std::{fs::File, io::Write, path::PathBuf};

    /// Writes a 4x3 int16 grid at 1 degree spacing whose samples
    /// encode their (col, row-from-north) position as `row * 10 + col`.
    fn write_grid(dir: &tempfile::TempDir) -> PathBuf {
        let data_path = dir.path().join("grid.bin");
        let mut hdr = File::create(dir.path().join("grid.hdr")).unwrap();
        write!(
            hdr,
            "NCOLS 4\nNROWS 3\nXLLCENTER -1.0\nYLLCENTER 50.0\nCELLSIZE 1.0\n\
             NODATA_VALUE -32768\nBYTEORDER LSBFIRST\nNUMBERTYPE 2_BYTE_INTEGER\n"
        )
        .unwrap();
        let mut data = File::create(&data_path).unwrap();
        for row in 0..3_i16 {
            for col in 0..4_i16 {
                let sample = if (row, col) == (2, 3) { -32768 } else { row * 10 + col };
                data.write_i16::<LE>(sample).unwrap();
            }
        }
        data_path
    }

    #[test]
    fn test_load_and_memmap_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_grid(&dir);
        let parsed = Raster::open(&path, RasterMode::InMem).unwrap();
        let mapped = Raster::open(&path, RasterMode::MemMap).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(parsed.get_xy((x, y)), mapped.get_xy((x, y)));
            }
        }
    }

    #[test]
    fn test_south_west_origin() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster::load(write_grid(&dir)).unwrap();
        // South most row is the last on disk.
        assert_eq!(raster.get_xy((0, 0)), Some(20.0));
        assert_eq!(raster.get_xy((1, 2)), Some(1.0));
        assert_eq!(raster.get_xy((3, 0)), None, "no-data sample");
        assert_eq!(raster.get_xy((4, 0)), None);
        assert_eq!(raster.latitudes(), vec![50.0, 51.0, 52.0]);
        assert_eq!(raster.longitudes(), vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(raster.ne_corner_center(), Coord { x: 2.0, y: 52.0 });
    }

    #[test]
    fn test_geo_index() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster::load(write_grid(&dir)).unwrap();
        assert_eq!(raster.get(Coord { x: 0.2, y: 51.4 }), Some(11.0));
        assert_eq!(raster.get(Coord { x: -1.6, y: 51.0 }), None);
        assert_eq!(raster.get(Coord { x: 0.0, y: 53.6 }), None);
    }

    #[test]
    fn test_bad_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_grid(&dir);
        File::options()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(&[0])
            .unwrap();
        assert!(matches!(Raster::load(&path), Err(EtopoError::DataLen(25, _))));
    }
}
