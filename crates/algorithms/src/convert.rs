//! The raster-to-hexagons conversion pipeline.
//!
//! Reads the extent and CRS from a stack of co-registered rasters, covers
//! the extent with H3 cells, and emits one polygon feature per cell with
//! the cell index and one sampled value per raster.

use crate::sampling::{self, Statistic};
use crate::tessellation::{self, Coverage, GeoExtent, DEFAULT_SCAN_STEP};
use geo_types::{Coord, Geometry, LineString, Polygon};
use h3o::{CellIndex, Resolution};
use hexrast_core::{
    Algorithm, AttributeValue, Crs, Error, Feature, FeatureCollection, Projector, Raster, Result,
};

/// Name of the text attribute holding the cell index
pub const CELL_INDEX_FIELD: &str = "H3_ID";

/// Parameters for the conversion
#[derive(Debug, Clone)]
pub struct HexSamplingParams {
    /// H3 resolution of the output cells
    pub resolution: Resolution,
    /// Lat/lon scan increment in degrees
    pub step: f64,
    /// Cell enumeration strategy
    pub coverage: Coverage,
    /// Per-cell sampling statistic
    pub statistic: Statistic,
}

impl Default for HexSamplingParams {
    fn default() -> Self {
        Self {
            resolution: Resolution::Nine,
            step: DEFAULT_SCAN_STEP,
            coverage: Coverage::default(),
            statistic: Statistic::default(),
        }
    }
}

/// A stack of co-registered rasters and their output field names
#[derive(Debug, Clone, Default)]
pub struct SamplingStack {
    pub rasters: Vec<Raster<f64>>,
    pub field_names: Vec<String>,
}

/// Raster-to-hexagons algorithm
#[derive(Debug, Clone, Default)]
pub struct RasterToHexagons;

impl Algorithm for RasterToHexagons {
    type Input = SamplingStack;
    type Output = FeatureCollection;
    type Params = HexSamplingParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "RasterToHexagons"
    }

    fn description(&self) -> &'static str {
        "Convert raster grids into an H3 hexagon tessellation with sampled attribute values"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        raster_to_hexagons(&input.rasters, &input.field_names, &params)
    }
}

/// Convert a raster stack into hexagon polygon features.
///
/// Output features carry the cell boundary polygon in the rasters'
/// coordinate system, the cell index under [`CELL_INDEX_FIELD`], and one
/// double attribute per raster, order-matched to `field_names`. Each
/// distinct cell produces exactly one feature.
pub fn raster_to_hexagons(
    rasters: &[Raster<f64>],
    field_names: &[String],
    params: &HexSamplingParams,
) -> Result<FeatureCollection> {
    if rasters.is_empty() {
        return Err(Error::InvalidParameter {
            name: "rasters",
            value: "[]".into(),
            reason: "at least one input raster is required".into(),
        });
    }
    if rasters.len() != field_names.len() {
        return Err(Error::FieldCountMismatch {
            rasters: rasters.len(),
            fields: field_names.len(),
        });
    }

    let first = &rasters[0];
    for (index, raster) in rasters.iter().enumerate().skip(1) {
        ensure_coregistered(first, raster, index)?;
    }

    // A raster without CRS metadata is taken to be WGS84 geographic
    let crs = first.crs().cloned().unwrap_or_else(Crs::wgs84);
    let projector = Projector::for_crs(&crs)?;

    // Extent in WGS84: project all four corners and take the envelope
    let (rows, cols) = first.shape();
    let mut corners = Vec::with_capacity(4);
    for (x, y) in first.transform().corner_coords(cols, rows) {
        corners.push(projector.to_wgs84(x, y)?);
    }
    let extent = GeoExtent::from_corners(corners);

    let cells =
        tessellation::covering_cells(&extent, params.resolution, params.coverage, params.step)?;

    let mut collection = FeatureCollection::new();
    for cell in cells {
        collection.push(build_feature(rasters, field_names, &projector, cell, params)?);
    }

    Ok(collection)
}

fn build_feature(
    rasters: &[Raster<f64>],
    field_names: &[String],
    projector: &Projector,
    cell: CellIndex,
    params: &HexSamplingParams,
) -> Result<Feature> {
    // Boundary in WGS84, reprojected into the raster CRS
    let boundary = tessellation::cell_polygon(cell);
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(boundary.exterior().0.len());
    for coord in boundary.exterior().coords() {
        let (x, y) = projector.from_wgs84(coord.x, coord.y)?;
        ring.push(Coord { x, y });
    }
    let footprint = Polygon::new(LineString::new(ring), vec![]);

    let values = match params.statistic {
        Statistic::Center => sampling::sample_center(rasters, projector, cell)?,
        Statistic::Mean => sampling::sample_mean(rasters, &footprint),
    };

    let index = cell.to_string();
    let mut feature = Feature::new(Geometry::Polygon(footprint)).with_id(index.clone());
    feature.set_property(CELL_INDEX_FIELD, AttributeValue::String(index));
    for (name, value) in field_names.iter().zip(values) {
        feature.set_property(name.clone(), AttributeValue::Float(value));
    }

    Ok(feature)
}

fn ensure_coregistered(first: &Raster<f64>, raster: &Raster<f64>, index: usize) -> Result<()> {
    if raster.shape() != first.shape() {
        let (er, ec) = first.shape();
        let (ar, ac) = raster.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let crs_id = |r: &Raster<f64>| {
        r.crs()
            .map(|c| c.identifier())
            .unwrap_or_else(|| "unset".to_string())
    };
    if !raster.is_coregistered_with(first) {
        // Same shape, so the transform or CRS differs
        if raster.transform() != first.transform() {
            return Err(Error::InvalidParameter {
                name: "rasters",
                value: format!("#{}", index),
                reason: "geotransform differs from the first raster".into(),
            });
        }
        return Err(Error::CrsMismatch(crs_id(first), crs_id(raster)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexrast_core::GeoTransform;

    /// 20x20 WGS84 raster covering a 0.02° x 0.02° box near Madrid
    fn wgs84_box_raster(value: f64) -> Raster<f64> {
        let mut raster = Raster::filled(20, 20, value);
        raster.set_transform(GeoTransform::new(-3.72, 40.42, 0.001, -0.001));
        raster.set_crs(Some(Crs::wgs84()));
        raster
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_stack_rejected() {
        let err = raster_to_hexagons(&[], &[], &HexSamplingParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn field_count_mismatch_rejected() {
        let rasters = vec![wgs84_box_raster(1.0)];
        let err = raster_to_hexagons(&rasters, &names(&["a", "b"]), &HexSamplingParams::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::FieldCountMismatch { rasters: 1, fields: 2 }
        ));
    }

    #[test]
    fn uncoregistered_stack_rejected() {
        let a = wgs84_box_raster(1.0);
        let mut b = wgs84_box_raster(1.0);
        b.set_transform(GeoTransform::new(-3.70, 40.42, 0.001, -0.001));

        let err = raster_to_hexagons(
            &[a, b],
            &names(&["a", "b"]),
            &HexSamplingParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn crs_mismatch_rejected() {
        let a = wgs84_box_raster(1.0);
        let mut b = wgs84_box_raster(1.0);
        b.set_crs(Some(Crs::from_epsg(32630)));

        let err = raster_to_hexagons(
            &[a, b],
            &names(&["a", "b"]),
            &HexSamplingParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::CrsMismatch(_, _)));
    }

    #[test]
    fn one_feature_per_distinct_cell() {
        let rasters = vec![wgs84_box_raster(5.0)];
        let fc =
            raster_to_hexagons(&rasters, &names(&["value"]), &HexSamplingParams::default())
                .unwrap();

        assert!(!fc.is_empty());
        let ids: std::collections::BTreeSet<String> = fc
            .iter()
            .map(|f| match f.get_property(CELL_INDEX_FIELD) {
                Some(AttributeValue::String(s)) => s.clone(),
                other => panic!("missing cell index attribute: {:?}", other),
            })
            .collect();
        assert_eq!(ids.len(), fc.len());
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn algorithm_trait_executes_pipeline() {
        let stack = SamplingStack {
            rasters: vec![wgs84_box_raster(2.0)],
            field_names: names(&["value"]),
        };
        let fc = RasterToHexagons
            .execute(stack, HexSamplingParams::default())
            .unwrap();
        assert!(!fc.is_empty());
    }
}
