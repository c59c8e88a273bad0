//! GeoPackage output through GDAL's vector API.
//!
//! Field definitions are derived from the first feature: string attributes
//! become OFTString, integers OFTInteger64, floats OFTReal. Only polygon
//! geometries are supported, which is all the hexagon sampler produces.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, FeatureCollection};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    Feature as OgrFeature, FieldValue, Geometry as OgrGeometry, LayerAccess, OGRFieldType,
    OGRwkbGeometryType,
};
use gdal::{DriverManager, LayerOptions};
use geo_types::Geometry;
use std::path::Path;

/// Write a feature collection to a GeoPackage layer
pub fn write_gpkg<P: AsRef<Path>>(
    fc: &FeatureCollection,
    crs: Option<&Crs>,
    path: P,
    layer_name: &str,
) -> Result<()> {
    let driver = DriverManager::get_driver_by_name("GPKG")?;
    let mut dataset = driver.create_vector_only(path.as_ref())?;

    let srs = crs.map(spatial_ref_from_crs).transpose()?;
    let layer = dataset.create_layer(LayerOptions {
        name: layer_name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbPolygon,
        options: None,
    })?;

    // Schema from the first feature; sorted for a stable column order
    let mut field_defs: Vec<(String, OGRFieldType::Type)> = match fc.iter().next() {
        Some(first) => first
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), field_type_for(value)))
            .collect(),
        None => return Ok(()),
    };
    field_defs.sort_by(|a, b| a.0.cmp(&b.0));

    let defs: Vec<(&str, OGRFieldType::Type)> =
        field_defs.iter().map(|(n, t)| (n.as_str(), *t)).collect();
    layer.create_defn_fields(&defs)?;

    for feature in fc.iter() {
        let mut ogr_feature = OgrFeature::new(layer.defn())?;
        ogr_feature.set_geometry(polygon_to_ogr(&feature.geometry)?)?;

        for (name, _) in &field_defs {
            let value = feature.properties.get(name).unwrap_or(&AttributeValue::Null);
            match field_value_for(value) {
                Some(fv) => ogr_feature.set_field(name, &fv)?,
                None => ogr_feature.set_field_null(name)?,
            }
        }

        ogr_feature.create(&layer)?;
    }

    Ok(())
}

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

fn field_type_for(value: &AttributeValue) -> OGRFieldType::Type {
    match value {
        AttributeValue::String(_) => OGRFieldType::OFTString,
        AttributeValue::Int(_) => OGRFieldType::OFTInteger64,
        AttributeValue::Bool(_) => OGRFieldType::OFTInteger,
        _ => OGRFieldType::OFTReal,
    }
}

fn field_value_for(value: &AttributeValue) -> Option<FieldValue> {
    match value {
        AttributeValue::Null => None,
        AttributeValue::Bool(b) => Some(FieldValue::IntegerValue(*b as i32)),
        AttributeValue::Int(i) => Some(FieldValue::Integer64Value(*i)),
        AttributeValue::Float(f) if f.is_nan() => None,
        AttributeValue::Float(f) => Some(FieldValue::RealValue(*f)),
        AttributeValue::String(s) => Some(FieldValue::StringValue(s.clone())),
    }
}

fn polygon_to_ogr(geometry: &Geometry<f64>) -> Result<OgrGeometry> {
    let polygon = match geometry {
        Geometry::Polygon(p) => p,
        other => {
            return Err(Error::Other(format!(
                "Only polygon geometries are supported, got {:?}",
                std::mem::discriminant(other)
            )))
        }
    };

    let mut ring = OgrGeometry::empty(OGRwkbGeometryType::wkbLinearRing)?;
    for coord in polygon.exterior().coords() {
        ring.add_point_2d((coord.x, coord.y));
    }

    let mut ogr_polygon = OgrGeometry::empty(OGRwkbGeometryType::wkbPolygon)?;
    ogr_polygon.add_geometry(ring)?;
    Ok(ogr_polygon)
}
