//! Point transforms between WGS84 and raster coordinate systems.
//!
//! The native path implements WGS84 ↔ UTM (Snyder 1987, USGS formulas),
//! covering EPSG 326xx (UTM North) and 327xx (UTM South), which handles
//! Sentinel-2, Landsat, and most satellite imagery. No external C
//! dependencies (no libproj). Arbitrary CRS support is available through
//! GDAL's spatial reference machinery behind the `gdal` feature.

use crate::crs::Crs;
use crate::error::{Error, Result};

#[cfg(feature = "gdal")]
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Bidirectional point transform between WGS84 (lon/lat degrees) and a
/// raster's coordinate system.
pub enum Projector {
    /// Raster CRS is already WGS84 geographic
    Identity,
    /// UTM zone, computed natively
    Utm { zone: u32, north: bool },
    /// Arbitrary CRS through GDAL
    #[cfg(feature = "gdal")]
    Gdal {
        to_wgs84: CoordTransform,
        from_wgs84: CoordTransform,
    },
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Projector::Identity => f.write_str("Identity"),
            Projector::Utm { zone, north } => f
                .debug_struct("Utm")
                .field("zone", zone)
                .field("north", north)
                .finish(),
            #[cfg(feature = "gdal")]
            Projector::Gdal { .. } => f.write_str("Gdal"),
        }
    }
}

impl Projector {
    /// Build a projector for the given raster CRS.
    ///
    /// WGS84 and UTM are handled natively; anything else requires the
    /// `gdal` feature and fails with [`Error::UnsupportedCrs`] without it.
    pub fn for_crs(crs: &Crs) -> Result<Self> {
        if crs.is_wgs84() {
            return Ok(Projector::Identity);
        }

        if let Some((zone, north)) = crs.epsg().and_then(parse_utm_epsg) {
            return Ok(Projector::Utm { zone, north });
        }

        #[cfg(feature = "gdal")]
        return gdal_projector(crs);

        #[cfg(not(feature = "gdal"))]
        Err(Error::UnsupportedCrs(crs.identifier()))
    }

    /// Transform a point in the raster CRS to WGS84 `(lon, lat)` degrees.
    pub fn to_wgs84(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            Projector::Identity => Ok((x, y)),
            Projector::Utm { zone, north } => Ok(utm_to_wgs84(x, y, *zone, *north)),
            #[cfg(feature = "gdal")]
            Projector::Gdal { to_wgs84, .. } => transform_point(to_wgs84, x, y),
        }
    }

    /// Transform a WGS84 `(lon, lat)` degree point into the raster CRS.
    pub fn from_wgs84(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        match self {
            Projector::Identity => Ok((lon, lat)),
            Projector::Utm { zone, north } => Ok(wgs84_to_utm(lon, lat, *zone, *north)),
            #[cfg(feature = "gdal")]
            Projector::Gdal { from_wgs84, .. } => transform_point(from_wgs84, lon, lat),
        }
    }
}

#[cfg(feature = "gdal")]
fn gdal_projector(crs: &Crs) -> Result<Projector> {
    let mut target = spatial_ref_from_crs(crs)?;
    target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let mut wgs84 = SpatialRef::from_epsg(4326)?;
    wgs84.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

    Ok(Projector::Gdal {
        to_wgs84: CoordTransform::new(&target, &wgs84)?,
        from_wgs84: CoordTransform::new(&wgs84, &target)?,
    })
}

#[cfg(feature = "gdal")]
fn spatial_ref_from_crs(crs: &Crs) -> Result<SpatialRef> {
    if let Some(code) = crs.epsg() {
        return Ok(SpatialRef::from_epsg(code)?);
    }
    if let Some(wkt) = crs.wkt() {
        return Ok(SpatialRef::from_wkt(wkt)?);
    }
    if let Some(proj) = crs.proj() {
        return Ok(SpatialRef::from_proj4(proj)?);
    }
    Err(Error::UnsupportedCrs(crs.identifier()))
}

#[cfg(feature = "gdal")]
fn transform_point(transform: &CoordTransform, x: f64, y: f64) -> Result<(f64, f64)> {
    let mut xs = [x];
    let mut ys = [y];
    let mut zs = [0.0];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok((xs[0], ys[0]))
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

/// Central meridian of a UTM zone, in radians.
fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    // Meridional arc length M (Snyder eq. 3-21)
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Easting (Snyder eq. 8-9)
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2)
                * a4
                * a_coeff
                / 120.0)
        + FALSE_EASTING;

    // Northing (Snyder eq. 8-10)
    let northing = K0
        * (m
            + n * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Convert UTM (easting, northing) in metres to WGS84 (longitude, latitude)
/// in degrees for the given zone and hemisphere.
///
/// Snyder eq. 8-17 through 8-25 (inverse Transverse Mercator).
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };
    let lon0 = central_meridian(zone);

    let e4 = E2 * E2;
    let e6 = e4 * E2;

    // Footpoint latitude (Snyder eq. 7-19 / 3-24)
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = A / (1.0 - E2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = A * (1.0 - E2) / (1.0 - E2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d2 * d2;
    let d5 = d4 * d;
    let d6 = d4 * d2;

    // Latitude (Snyder eq. 8-17)
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    // Longitude (Snyder eq. 8-18)
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: assert two values are within `tol` of each other.
    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    #[test]
    fn parse_utm_north() {
        assert_eq!(parse_utm_epsg(32630), Some((30, true)));
        assert_eq!(parse_utm_epsg(32601), Some((1, true)));
        assert_eq!(parse_utm_epsg(32660), Some((60, true)));
    }

    #[test]
    fn parse_utm_south() {
        assert_eq!(parse_utm_epsg(32721), Some((21, false)));
        assert_eq!(parse_utm_epsg(32701), Some((1, false)));
        assert_eq!(parse_utm_epsg(32760), Some((60, false)));
    }

    #[test]
    fn parse_utm_invalid() {
        assert_eq!(parse_utm_epsg(4326), None);
        assert_eq!(parse_utm_epsg(3857), None);
        assert_eq!(parse_utm_epsg(32600), None); // zone 0 invalid
        assert_eq!(parse_utm_epsg(32661), None); // zone 61 invalid
        assert_eq!(parse_utm_epsg(32700), None);
    }

    // Reference values from pyproj (PROJ 9.x):
    //   from pyproj import Transformer
    //   t = Transformer.from_crs(4326, 32630, always_xy=True)
    //   t.transform(-3.7037, 40.4168) → (440298.94, 4474257.31)
    #[test]
    fn madrid_wgs84_to_utm30n() {
        let (e, n) = wgs84_to_utm(-3.7037, 40.4168, 30, true);
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    // Buenos Aires: (-58.3816, -34.6037) → UTM 21S (EPSG:32721)
    //   t = Transformer.from_crs(4326, 32721, always_xy=True)
    //   t.transform(-58.3816, -34.6037) → (373317.50, 6170036.17)
    #[test]
    fn buenos_aires_wgs84_to_utm21s() {
        let (e, n) = wgs84_to_utm(-58.3816, -34.6037, 21, false);
        assert_close(e, 373_317.50, 1.0, "easting");
        assert_close(n, 6_170_036.17, 1.0, "northing");
    }

    // Equator at zone 30 central meridian (-3°): easting should be 500000
    #[test]
    fn equator_central_meridian() {
        let (e, n) = wgs84_to_utm(-3.0, 0.0, 30, true);
        assert_close(e, 500_000.0, 0.01, "easting at CM");
        assert_close(n, 0.0, 0.01, "northing at equator");
    }

    #[test]
    fn utm_inverse_madrid() {
        let (lon, lat) = utm_to_wgs84(440_298.94, 4_474_257.31, 30, true);
        assert_close(lon, -3.7037, 1e-5, "longitude");
        assert_close(lat, 40.4168, 1e-5, "latitude");
    }

    #[test]
    fn utm_roundtrip_north_and_south() {
        for &(lon, lat, zone, north) in &[
            (-3.7037, 40.4168, 30, true),
            (-58.3816, -34.6037, 21, false),
            (139.6917, 35.6895, 54, true), // Tokyo
        ] {
            let (e, n) = wgs84_to_utm(lon, lat, zone, north);
            let (lon2, lat2) = utm_to_wgs84(e, n, zone, north);
            assert_close(lon2, lon, 1e-6, "roundtrip longitude");
            assert_close(lat2, lat, 1e-6, "roundtrip latitude");
        }
    }

    #[test]
    fn projector_identity_for_wgs84() {
        let p = Projector::for_crs(&Crs::wgs84()).unwrap();
        let (x, y) = p.from_wgs84(-3.75, 40.40).unwrap();
        assert_close(x, -3.75, f64::EPSILON, "lon passthrough");
        assert_close(y, 40.40, f64::EPSILON, "lat passthrough");
    }

    #[test]
    fn projector_utm_roundtrip() {
        let p = Projector::for_crs(&Crs::from_epsg(32630)).unwrap();
        let (x, y) = p.from_wgs84(-3.7037, 40.4168).unwrap();
        assert!(x > 100_000.0, "easting should be in metres");
        let (lon, lat) = p.to_wgs84(x, y).unwrap();
        assert_close(lon, -3.7037, 1e-6, "roundtrip longitude");
        assert_close(lat, 40.4168, 1e-6, "roundtrip latitude");
    }

    #[cfg(not(feature = "gdal"))]
    #[test]
    fn projector_rejects_unsupported_crs_natively() {
        let err = Projector::for_crs(&Crs::from_epsg(3857)).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedCrs(_)));
    }
}
