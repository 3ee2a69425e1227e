// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Municipality boundary loading and spatial helpers.
//!
//! Boundaries come from a WGS84 GeoJSON FeatureCollection with one feature per
//! municipality. The Finnish name is read from the `NAMEFIN` property and the
//! border length from `Rajaviivan pituus` when present.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::{Centroid, LineString, MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, GeoJson};
use log::info;

use crate::errors::DataError;
use crate::stats::StatsTable;

const NAME_PROPERTY: &str = "NAMEFIN";
const BORDER_LENGTH_PROPERTY: &str = "Rajaviivan pituus";
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two lon/lat points in kilometres.
fn haversine_distance_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

fn ring_length_km(ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|line| haversine_distance_km(line.start.x, line.start.y, line.end.x, line.end.y))
        .sum()
}

/// A single municipality feature
#[derive(Debug, Clone)]
pub struct Municipality {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
    /// Border length in kilometres (display only)
    pub border_length_km: f64,
    /// True when the municipality appears in the statistics table
    pub traversed: bool,
}

impl Municipality {
    /// Build from a GeoJSON feature, promoting polygons to multipolygons
    fn from_feature(index: usize, feature: Feature) -> Result<Self, DataError> {
        let name = feature
            .property(NAME_PROPERTY)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(DataError::MissingProperty {
                feature: index,
                property: NAME_PROPERTY,
            })?;

        let geometry = feature
            .geometry
            .ok_or_else(|| DataError::InvalidGeometry(name.clone()))?;
        let boundary = match geo::Geometry::<f64>::try_from(geometry) {
            Ok(geo::Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon]),
            Ok(geo::Geometry::MultiPolygon(multi)) => multi,
            _ => return Err(DataError::InvalidGeometry(name)),
        };

        let border_length_km = feature
            .properties
            .as_ref()
            .and_then(|p| p.get(BORDER_LENGTH_PROPERTY))
            .and_then(serde_json::Value::as_f64)
            .unwrap_or_else(|| Self::perimeter_km(&boundary));

        Ok(Self {
            name,
            boundary,
            border_length_km,
            traversed: false,
        })
    }

    /// Haversine length of every ring of the boundary
    #[must_use]
    pub fn perimeter_km(boundary: &MultiPolygon<f64>) -> f64 {
        boundary
            .iter()
            .map(|polygon| {
                ring_length_km(polygon.exterior())
                    + polygon.interiors().iter().map(ring_length_km).sum::<f64>()
            })
            .sum()
    }

    #[must_use]
    pub fn centroid(&self) -> Option<Point<f64>> {
        self.boundary.centroid()
    }

    /// Boundary rings as parallel latitude / longitude vectors.
    ///
    /// Rings are separated by `None` so a line trace breaks between them.
    #[must_use]
    pub fn outline(&self) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        let mut lats = Vec::new();
        let mut lons = Vec::new();

        for polygon in &self.boundary {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
            for ring in rings {
                if !lats.is_empty() {
                    lats.push(None);
                    lons.push(None);
                }
                for coord in ring.coords() {
                    lats.push(Some(coord.y));
                    lons.push(Some(coord.x));
                }
            }
        }

        (lats, lons)
    }
}

/// Container for all municipality features
#[derive(Debug, Default)]
pub struct MunicipalityData {
    pub municipalities: Vec<Municipality>,
}

impl MunicipalityData {
    /// Load municipalities from a GeoJSON file
    pub fn load_geojson<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DataError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let geojson = GeoJson::from_reader(BufReader::new(file)).map_err(geojson::Error::from)?;
        let data = Self::from_geojson(geojson)?;

        info!("Loaded {} municipalities from {}", data.municipalities.len(), path.display());
        Ok(data)
    }

    /// Build from an already parsed GeoJSON document
    pub fn from_geojson(geojson: GeoJson) -> Result<Self, DataError> {
        let collection = FeatureCollection::try_from(geojson)?;
        let municipalities = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| Municipality::from_feature(index, feature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { municipalities })
    }

    /// Set `traversed` for every municipality named in the statistics table
    pub fn mark_traversed(&mut self, stats: &StatsTable) {
        for municipality in &mut self.municipalities {
            municipality.traversed = stats.contains(&municipality.name);
        }
    }

    /// Number of traversed municipalities
    #[must_use]
    pub fn traversed_count(&self) -> usize {
        self.municipalities.iter().filter(|m| m.traversed).count()
    }
}

#[cfg(test)]
impl MunicipalityData {
    pub(crate) fn get(&self, name: &str) -> Option<&Municipality> {
        self.municipalities.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "NAMEFIN": "Kauniainen", "Rajaviivan pituus": 12.4 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[24.70, 60.20], [24.74, 60.20], [24.74, 60.22], [24.70, 60.22], [24.70, 60.20]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAMEFIN": "Espoo" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[24.50, 60.10], [24.60, 60.10], [24.60, 60.20], [24.50, 60.20], [24.50, 60.10]]],
                        [[[24.40, 60.05], [24.45, 60.05], [24.45, 60.08], [24.40, 60.05]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAMEFIN": "Vantaa", "Rajaviivan pituus": 80.0 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[24.80, 60.25], [25.00, 60.25], [25.00, 60.35], [24.80, 60.25]]]
                }
            }
        ]
    }"#;

    pub(crate) fn sample_data() -> MunicipalityData {
        MunicipalityData::from_geojson(SAMPLE_GEOJSON.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_load_features() {
        let data = sample_data();
        assert_eq!(data.municipalities.len(), 3);

        let kauniainen = data.get("Kauniainen").unwrap();
        assert_eq!(kauniainen.boundary.0.len(), 1);
        assert!((kauniainen.border_length_km - 12.4).abs() < f64::EPSILON);

        let espoo = data.get("Espoo").unwrap();
        assert_eq!(espoo.boundary.0.len(), 2);
        assert!(espoo.border_length_km > 0.0);
    }

    #[test]
    fn test_computed_perimeter() {
        // 0.1 degrees of latitude is roughly 11.1 km
        let data = sample_data();
        let espoo = data.get("Espoo").unwrap();
        assert!(espoo.border_length_km > 40.0 && espoo.border_length_km < 60.0);
    }

    #[test]
    fn test_centroid_and_outline() {
        let data = sample_data();
        let kauniainen = data.get("Kauniainen").unwrap();
        let centroid = kauniainen.centroid().unwrap();
        assert!((centroid.x() - 24.72).abs() < 1e-9);
        assert!((centroid.y() - 60.21).abs() < 1e-9);

        let (lats, lons) = kauniainen.outline();
        assert_eq!(lats.len(), 5);
        assert_eq!(lons[1], Some(24.74));

        let (lats, _) = data.get("Espoo").unwrap().outline();
        assert_eq!(lats.len(), 5 + 1 + 4);
        assert_eq!(lats[5], None);
    }

    #[test]
    fn test_missing_name_is_error() {
        let geojson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [24.0, 60.0]}}
        ]}"#;
        let result = MunicipalityData::from_geojson(geojson.parse().unwrap());
        assert!(matches!(result, Err(DataError::MissingProperty { feature: 0, .. })));
    }

    #[test]
    fn test_point_geometry_is_error() {
        let geojson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"NAMEFIN": "Piste"}, "geometry": {"type": "Point", "coordinates": [24.0, 60.0]}}
        ]}"#;
        let result = MunicipalityData::from_geojson(geojson.parse().unwrap());
        assert!(matches!(result, Err(DataError::InvalidGeometry(name)) if name == "Piste"));
    }

    #[test]
    fn test_load_geojson_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kunnat.geojson");
        std::fs::write(&path, SAMPLE_GEOJSON).unwrap();

        let data = MunicipalityData::load_geojson(&path).unwrap();
        assert_eq!(data.municipalities.len(), 3);
        assert!(MunicipalityData::load_geojson(dir.path().join("missing.geojson")).is_err());
    }

    #[test]
    fn test_malformed_geojson_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        std::fs::write(&path, r#"{"type": "FeatureCollection", "features": ["#).unwrap();

        let result = MunicipalityData::load_geojson(&path);
        assert!(matches!(result, Err(DataError::GeoJson(_))));
    }

    #[test]
    fn test_haversine_distance() {
        // Helsinki to Tampere is roughly 160 km
        let distance = haversine_distance_km(24.9384, 60.1699, 23.7610, 61.4978);
        assert!((distance - 160.0).abs() < 5.0);
    }
}
