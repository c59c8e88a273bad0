//! Raster value sampling for hexagon cells.
//!
//! The default statistic reads the single pixel under the cell centroid.
//! The `Mean` statistic aggregates every pixel whose center falls inside
//! the cell's footprint polygon instead, which reflects the raster signal
//! across the whole cell at the cost of more reads.
//!
//! A centroid outside a raster's footprint, or on a no-data pixel, samples
//! as NaN rather than failing: cells at the extent edge routinely overhang
//! the raster.

use crate::tessellation::cell_center;
use geo::{BoundingRect, Contains};
use geo_types::{Point, Polygon};
use h3o::CellIndex;
use hexrast_core::{Projector, Raster, Result};

/// Per-cell sampling statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Statistic {
    /// Single pixel under the cell centroid
    #[default]
    Center,
    /// Mean of all valid pixels inside the cell footprint
    Mean,
}

/// Sample every raster at the centroid of `cell`.
///
/// Returns one value per raster, in input order.
pub fn sample_center(
    rasters: &[Raster<f64>],
    projector: &Projector,
    cell: CellIndex,
) -> Result<Vec<f64>> {
    let (lon, lat) = cell_center(cell);
    let (x, y) = projector.from_wgs84(lon, lat)?;

    Ok(rasters.iter().map(|r| sample_point(r, x, y)).collect())
}

/// Read the pixel containing `(x, y)` in raster coordinates.
///
/// NaN when the point is outside the grid or the pixel holds no-data.
pub fn sample_point(raster: &Raster<f64>, x: f64, y: f64) -> f64 {
    let (col, row) = raster.geo_to_pixel(x, y);
    if !col.is_finite() || !row.is_finite() {
        return f64::NAN;
    }

    let (col, row) = (col.floor(), row.floor());
    if col < 0.0 || row < 0.0 || col >= raster.cols() as f64 || row >= raster.rows() as f64 {
        return f64::NAN;
    }

    match raster.get(row as usize, col as usize) {
        Ok(value) if !raster.is_nodata(value) => value,
        _ => f64::NAN,
    }
}

/// Mean of all valid pixels whose centers fall inside `footprint`.
///
/// The footprint polygon must be in the rasters' coordinate system. All
/// rasters share one grid (the stack is co-registered), so the contained
/// pixel set is computed once. A footprint with no valid pixel yields NaN.
pub fn sample_mean(rasters: &[Raster<f64>], footprint: &Polygon<f64>) -> Vec<f64> {
    let Some(first) = rasters.first() else {
        return Vec::new();
    };
    let Some(rect) = footprint.bounding_rect() else {
        return vec![f64::NAN; rasters.len()];
    };

    let (rows, cols) = first.shape();

    // Pixel range covered by the footprint bbox, clamped to the grid
    let (c0, r0) = first.geo_to_pixel(rect.min().x, rect.max().y);
    let (c1, r1) = first.geo_to_pixel(rect.max().x, rect.min().y);
    let col_start = c0.min(c1).floor().max(0.0) as usize;
    let row_start = r0.min(r1).floor().max(0.0) as usize;
    let col_end = (c0.max(c1).ceil() as usize).min(cols);
    let row_end = (r0.max(r1).ceil() as usize).min(rows);

    let mut inside: Vec<(usize, usize)> = Vec::new();
    for row in row_start..row_end {
        for col in col_start..col_end {
            let (x, y) = first.pixel_to_geo(col, row);
            if footprint.contains(&Point::new(x, y)) {
                inside.push((row, col));
            }
        }
    }

    rasters
        .iter()
        .map(|raster| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &(row, col) in &inside {
                if let Ok(value) = raster.get(row, col) {
                    if !raster.is_nodata(value) {
                        sum += value;
                        count += 1;
                    }
                }
            }
            if count > 0 {
                sum / count as f64
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;
    use hexrast_core::GeoTransform;

    fn gradient_raster() -> Raster<f64> {
        // 10x10, origin (0, 10), unit pixels; value = row * 10 + col
        let mut raster = Raster::new(10, 10);
        raster.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 0..10 {
            for col in 0..10 {
                raster.set(row, col, (row * 10 + col) as f64).unwrap();
            }
        }
        raster
    }

    #[test]
    fn sample_point_reads_containing_pixel() {
        let raster = gradient_raster();

        // (2.5, 7.5) lies in pixel (col 2, row 2)
        assert_eq!(sample_point(&raster, 2.5, 7.5), 22.0);
        // Pixel edges floor toward the next pixel
        assert_eq!(sample_point(&raster, 0.0, 10.0), 0.0);
    }

    #[test]
    fn sample_point_outside_is_nan() {
        let raster = gradient_raster();
        assert!(sample_point(&raster, -0.5, 5.0).is_nan());
        assert!(sample_point(&raster, 10.5, 5.0).is_nan());
        assert!(sample_point(&raster, 5.0, 10.5).is_nan());
    }

    #[test]
    fn sample_point_nodata_is_nan() {
        let mut raster = gradient_raster();
        raster.set_nodata(Some(22.0));
        assert!(sample_point(&raster, 2.5, 7.5).is_nan());
    }

    #[test]
    fn mean_of_constant_patch() {
        let mut raster = Raster::filled(10, 10, 3.0);
        raster.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        let footprint = polygon![
            (x: 1.0, y: 9.0),
            (x: 5.0, y: 9.0),
            (x: 5.0, y: 5.0),
            (x: 1.0, y: 5.0),
        ];
        let means = sample_mean(&[raster], &footprint);
        assert_eq!(means, vec![3.0]);
    }

    #[test]
    fn mean_skips_nodata_pixels() {
        let mut raster = Raster::filled(4, 4, 8.0);
        raster.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        raster.set_nodata(Some(-1.0));
        raster.set(1, 1, -1.0).unwrap();

        let footprint = polygon![
            (x: 0.0, y: 4.0),
            (x: 4.0, y: 4.0),
            (x: 4.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ];
        let means = sample_mean(&[raster], &footprint);
        assert_eq!(means, vec![8.0]);
    }

    #[test]
    fn mean_of_empty_footprint_is_nan() {
        let raster = gradient_raster();
        // Entirely outside the grid
        let footprint = polygon![
            (x: 100.0, y: 100.0),
            (x: 101.0, y: 100.0),
            (x: 101.0, y: 101.0),
            (x: 100.0, y: 101.0),
        ];
        let means = sample_mean(&[raster], &footprint);
        assert_eq!(means.len(), 1);
        assert!(means[0].is_nan());
    }
}
