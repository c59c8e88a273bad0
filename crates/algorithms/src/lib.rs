//! # Hexrast Algorithms
//!
//! Conversion of raster grids into an H3 hexagonal tessellation.
//!
//! - **tessellation**: enumerate the hexagon cells covering a geographic extent
//! - **sampling**: read raster values at cell centers, or aggregate footprints
//! - **convert**: the full raster-to-hexagons pipeline

pub mod convert;
pub mod sampling;
pub mod tessellation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::convert::{
        raster_to_hexagons, HexSamplingParams, RasterToHexagons, SamplingStack, CELL_INDEX_FIELD,
    };
    pub use crate::sampling::Statistic;
    pub use crate::tessellation::{Coverage, GeoExtent, DEFAULT_SCAN_STEP};
    pub use hexrast_core::prelude::*;
}
