//! Decoding errors.
//!
//! Every failure here is local: it aborts one segment, one object raster or one
//! region placement, never the surrounding stream.

use thiserror::Error;

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("read of {requested} bits with only {remaining} bits left")]
    OutOfData { requested: usize, remaining: usize },
    #[error("object {object_id} has inconsistent field data: {detail}")]
    DimensionMismatch { object_id: u16, detail: String },
    #[error("region {region_id} references undefined CLUT {clut_id}")]
    MissingClut { region_id: u8, clut_id: u8 },
    #[error("region {region_id} references undefined object {object_id}")]
    MissingObject { region_id: u8, object_id: u16 },
    #[error("page references undefined region {0}")]
    MissingRegion(u8),
    #[error("pixel-data sub-block has unknown data type 0x{0:02x}")]
    UnknownDataType(u8),
    #[error("region {region_id} has invalid depth code {code}")]
    InvalidRegionDepth { region_id: u8, code: u8 },
    #[error("page composition uses the reserved page state")]
    ReservedPageState,
    #[error("{width}x{height} raster exceeds the pixel limit")]
    RasterTooLarge { width: usize, height: usize },
    #[error("object {object_id} uses unsupported coding method {method}")]
    UnsupportedCodingMethod { object_id: u16, method: u8 },
}
