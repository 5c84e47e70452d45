use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtopoError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid raster header {0}: {1}")]
    Header(PathBuf, String),

    #[error("invalid raster file len {0} for {1}")]
    DataLen(u64, PathBuf),
}
