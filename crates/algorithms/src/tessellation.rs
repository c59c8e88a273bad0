//! Hexagon cell enumeration over a geographic extent.
//!
//! Two strategies are available. `Scan` walks a fixed-step lat/lon lattice
//! across the extent and collects the cell under each sample point; with a
//! step much larger than the cell size it can skip cells entirely. `Expand`
//! grows outward from seed cells along the grid's own neighbor structure and
//! keeps every cell whose bounding box intersects the extent, so its
//! coverage does not depend on the step at all.

use h3o::{CellIndex, LatLng, Resolution};
use hexrast_core::{Error, Result};
use geo_types::{Coord, LineString, Polygon};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Default lat/lon scan increment in degrees
pub const DEFAULT_SCAN_STEP: f64 = 0.01;

/// Strategy for enumerating the cells covering an extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coverage {
    /// Fixed-step lat/lon scan (may miss cells finer than the step)
    #[default]
    Scan,
    /// Breadth-first neighbor expansion from seed cells
    Expand,
}

/// Geographic extent in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoExtent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoExtent {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Envelope of a set of (lon, lat) points
    pub fn from_corners(corners: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut extent = Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (lon, lat) in corners {
            extent.min_lon = extent.min_lon.min(lon);
            extent.min_lat = extent.min_lat.min(lat);
            extent.max_lon = extent.max_lon.max(lon);
            extent.max_lat = extent.max_lat.max(lat);
        }
        extent
    }

    /// Whether the extent encloses no area
    pub fn is_degenerate(&self) -> bool {
        self.max_lon <= self.min_lon || self.max_lat <= self.min_lat
    }

    /// Whether two extents overlap
    pub fn intersects(&self, other: &GeoExtent) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }
}

/// Enumerate the deduplicated set of cells covering `extent` at `resolution`.
///
/// A degenerate extent yields an empty set under either strategy.
pub fn covering_cells(
    extent: &GeoExtent,
    resolution: Resolution,
    coverage: Coverage,
    step: f64,
) -> Result<BTreeSet<CellIndex>> {
    if !(step > 0.0) {
        return Err(Error::InvalidParameter {
            name: "step",
            value: step.to_string(),
            reason: "scan step must be positive".into(),
        });
    }

    if extent.is_degenerate() {
        return Ok(BTreeSet::new());
    }

    match coverage {
        Coverage::Scan => scan_cells(extent, resolution, step),
        Coverage::Expand => expand_cells(extent, resolution),
    }
}

/// Fixed-step scan. Start-inclusive on both axes: an extent narrower than
/// one step still gets its starting sample, so it yields exactly one cell.
fn scan_cells(
    extent: &GeoExtent,
    resolution: Resolution,
    step: f64,
) -> Result<BTreeSet<CellIndex>> {
    let mut cells = BTreeSet::new();

    let mut lat = extent.min_lat;
    while lat < extent.max_lat {
        let mut lon = extent.min_lon;
        while lon < extent.max_lon {
            cells.insert(cell_at(lat, lon, resolution)?);
            lon += step;
        }
        lat += step;
    }

    Ok(cells)
}

/// Neighbor expansion. Seeds at the extent corners and center, then walks
/// `grid_disk(1)` neighbors, keeping every cell whose bounding box
/// intersects the extent. The kept region is connected, so the walk
/// terminates at the first ring of non-intersecting cells.
fn expand_cells(extent: &GeoExtent, resolution: Resolution) -> Result<BTreeSet<CellIndex>> {
    let mid_lon = (extent.min_lon + extent.max_lon) / 2.0;
    let mid_lat = (extent.min_lat + extent.max_lat) / 2.0;
    let seeds = [
        (extent.min_lat, extent.min_lon),
        (extent.min_lat, extent.max_lon),
        (extent.max_lat, extent.min_lon),
        (extent.max_lat, extent.max_lon),
        (mid_lat, mid_lon),
    ];

    let mut queue: VecDeque<CellIndex> = VecDeque::new();
    for (lat, lon) in seeds {
        queue.push_back(cell_at(lat, lon, resolution)?);
    }

    let mut kept = BTreeSet::new();
    let mut visited: HashSet<CellIndex> = HashSet::new();

    while let Some(cell) = queue.pop_front() {
        if !visited.insert(cell) {
            continue;
        }
        if !cell_extent(cell).intersects(extent) {
            continue;
        }
        kept.insert(cell);
        for neighbor in cell.grid_disk::<Vec<_>>(1) {
            if !visited.contains(&neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    Ok(kept)
}

fn cell_at(lat: f64, lon: f64, resolution: Resolution) -> Result<CellIndex> {
    let point = LatLng::new(lat, lon).map_err(|e| Error::HexGrid(e.to_string()))?;
    Ok(point.to_cell(resolution))
}

/// Cell center as a WGS84 `(lon, lat)` pair
pub fn cell_center(cell: CellIndex) -> (f64, f64) {
    let center = LatLng::from(cell);
    (
        center.lng_radians().to_degrees(),
        center.lat_radians().to_degrees(),
    )
}

/// Bounding box of a cell's boundary vertices
fn cell_extent(cell: CellIndex) -> GeoExtent {
    GeoExtent::from_corners(cell.boundary().iter().map(|v| {
        (
            v.lng_radians().to_degrees(),
            v.lat_radians().to_degrees(),
        )
    }))
}

/// Build the cell's boundary polygon in WGS84, (lon, lat) coordinate order
pub fn cell_polygon(cell: CellIndex) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = cell
        .boundary()
        .iter()
        .map(|v| Coord {
            x: v.lng_radians().to_degrees(),
            y: v.lat_radians().to_degrees(),
        })
        .collect();

    Polygon::new(LineString::new(ring), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(value: u8) -> Resolution {
        Resolution::try_from(value).unwrap()
    }

    #[test]
    fn scan_covers_small_box() {
        let extent = GeoExtent::new(-3.72, 40.40, -3.70, 40.42);
        let cells = covering_cells(&extent, res(9), Coverage::Scan, 0.01).unwrap();
        assert!(!cells.is_empty());

        // BTreeSet is already deduplicated; cross-check against the raw scan
        let mut raw = Vec::new();
        let mut lat = extent.min_lat;
        while lat < extent.max_lat {
            let mut lon = extent.min_lon;
            while lon < extent.max_lon {
                raw.push(LatLng::new(lat, lon).unwrap().to_cell(res(9)));
                lon += 0.01;
            }
            lat += 0.01;
        }
        assert!(cells.len() <= raw.len());
        assert!(raw.iter().all(|c| cells.contains(c)));
    }

    #[test]
    fn sub_step_extent_yields_one_cell() {
        // Narrower than one scan step in both axes
        let extent = GeoExtent::new(-3.701, 40.401, -3.700, 40.402);
        let cells = covering_cells(&extent, res(6), Coverage::Scan, 0.01).unwrap();
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn degenerate_extent_yields_no_cells() {
        let point = GeoExtent::new(-3.70, 40.40, -3.70, 40.40);
        for coverage in [Coverage::Scan, Coverage::Expand] {
            let cells = covering_cells(&point, res(9), coverage, 0.01).unwrap();
            assert!(cells.is_empty());
        }
    }

    #[test]
    fn invalid_step_rejected() {
        let extent = GeoExtent::new(-3.72, 40.40, -3.70, 40.42);
        assert!(covering_cells(&extent, res(9), Coverage::Scan, 0.0).is_err());
        assert!(covering_cells(&extent, res(9), Coverage::Scan, -0.01).is_err());
    }

    #[test]
    fn expand_is_superset_of_scan() {
        let extent = GeoExtent::new(-3.72, 40.40, -3.70, 40.42);
        let scanned = covering_cells(&extent, res(9), Coverage::Scan, 0.01).unwrap();
        let expanded = covering_cells(&extent, res(9), Coverage::Expand, 0.01).unwrap();

        // At resolution 9 cells are ~0.005° across, well under the 0.01°
        // step, so the scan must be missing some of them
        assert!(scanned.is_subset(&expanded));
        assert!(expanded.len() > scanned.len());
    }

    #[test]
    fn expand_keeps_only_intersecting_cells() {
        let extent = GeoExtent::new(-3.72, 40.40, -3.70, 40.42);
        let expanded = covering_cells(&extent, res(8), Coverage::Expand, 0.01).unwrap();
        for cell in &expanded {
            assert!(cell_extent(*cell).intersects(&extent));
        }
    }

    #[test]
    fn cell_polygon_is_closed_hexagon() {
        let cell = LatLng::new(40.41, -3.71).unwrap().to_cell(res(9));
        let polygon = cell_polygon(cell);
        let ring = polygon.exterior();

        // geo-types closes the ring on construction
        assert_eq!(ring.0.first(), ring.0.last());
        assert!(ring.0.len() >= 7, "hexagon ring should have >= 6 vertices");
    }

    #[test]
    fn cell_center_inside_cell_extent() {
        let cell = LatLng::new(40.41, -3.71).unwrap().to_cell(res(9));
        let (lon, lat) = cell_center(cell);
        let extent = cell_extent(cell);
        assert!(extent.min_lon <= lon && lon <= extent.max_lon);
        assert!(extent.min_lat <= lat && lat <= extent.max_lat);
    }
}
