//! GeoJSON serialization of feature collections.
//!
//! Coordinates are written exactly as stored; when the collection is in a
//! projected CRS, the legacy `crs` member records the EPSG code so readers
//! are not misled into assuming WGS84.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::feature::Id;
use geojson::{JsonObject, JsonValue};
use serde_json::json;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Convert a feature collection into its GeoJSON representation
pub fn to_geojson(fc: &FeatureCollection, crs: Option<&Crs>) -> geojson::FeatureCollection {
    let features = fc.iter().map(feature_to_geojson).collect();

    let foreign_members = crs.and_then(|c| c.epsg()).filter(|&c| c != 4326).map(|code| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", code) },
            }),
        );
        members
    });

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Write a feature collection to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(
    fc: &FeatureCollection,
    crs: Option<&Crs>,
    path: P,
) -> Result<()> {
    let collection = to_geojson(fc, crs);
    let file = File::create(path.as_ref())?;
    serde_json::to_writer(BufWriter::new(file), &collection)
        .map_err(|e| Error::Other(format!("GeoJSON serialization error: {}", e)))?;
    Ok(())
}

fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    let mut properties = JsonObject::new();
    for (key, value) in &feature.properties {
        properties.insert(key.clone(), attribute_to_json(value));
    }

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &feature.geometry,
        ))),
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => json!(b),
        AttributeValue::Int(i) => json!(i),
        // JSON has no NaN; a failed sample serializes as null
        AttributeValue::Float(f) if f.is_nan() => JsonValue::Null,
        AttributeValue::Float(f) => json!(f),
        AttributeValue::String(s) => json!(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Geometry};

    fn square(x: f64, y: f64) -> Feature {
        let poly = polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ];
        Feature::new(Geometry::Polygon(poly))
    }

    #[test]
    fn test_to_geojson_shape() {
        let mut fc = FeatureCollection::new();
        let mut f = square(0.0, 0.0).with_id("a");
        f.set_property("H3_ID", AttributeValue::String("a".into()));
        f.set_property("elev", AttributeValue::Float(12.0));
        fc.push(f);

        let gj = to_geojson(&fc, None);
        assert_eq!(gj.features.len(), 1);

        let props = gj.features[0].properties.as_ref().unwrap();
        assert_eq!(props.get("H3_ID"), Some(&json!("a")));
        assert_eq!(props.get("elev"), Some(&json!(12.0)));
        assert!(gj.foreign_members.is_none());
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let mut fc = FeatureCollection::new();
        let mut f = square(0.0, 0.0);
        f.set_property("elev", AttributeValue::Float(f64::NAN));
        fc.push(f);

        let gj = to_geojson(&fc, None);
        let props = gj.features[0].properties.as_ref().unwrap();
        assert_eq!(props.get("elev"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_projected_crs_member() {
        let fc = FeatureCollection { features: vec![square(440_000.0, 4_474_000.0)] };
        let gj = to_geojson(&fc, Some(&Crs::from_epsg(32630)));

        let members = gj.foreign_members.unwrap();
        let name = members["crs"]["properties"]["name"].as_str().unwrap();
        assert_eq!(name, "urn:ogc:def:crs:EPSG::32630");
    }

    #[test]
    fn test_written_file_parses_back() {
        use std::str::FromStr;

        let mut fc = FeatureCollection::new();
        fc.push(square(1.0, 2.0).with_id("cell"));

        let tmp = tempfile::NamedTempFile::with_suffix(".geojson").unwrap();
        write_geojson(&fc, None, tmp.path()).unwrap();

        let text = std::fs::read_to_string(tmp.path()).unwrap();
        let parsed = geojson::FeatureCollection::from_str(&text).unwrap();
        assert_eq!(parsed.features.len(), 1);
    }
}
