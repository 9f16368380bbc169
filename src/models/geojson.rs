//models/geojson.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Geometry,
    pub properties: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

impl Feature {
    pub fn point(lon: f64, lat: f64, properties: Value) -> Self {
        Feature {
            feature_type: "Feature".to_string(),
            geometry: Geometry {
                geometry_type: "Point".to_string(),
                coordinates: serde_json::json!([lon, lat]),
            },
            properties,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }
}

/// `POINT(lon lat)` untuk kolom spasial MySQL.
pub fn point_to_wkt(lon: f64, lat: f64) -> String {
    format!("POINT({} {})", lon, lat)
}

/// Kebalikan dari [`point_to_wkt`], dengan fallback `(0, 0)` untuk baris
/// lama yang geometrinya kosong atau rusak.
pub fn parse_wkt_point(wkt: &str) -> (f64, f64) {
    parse_wkt_point_opt(wkt).unwrap_or((0.0, 0.0))
}

fn parse_wkt_point_opt(wkt: &str) -> Option<(f64, f64)> {
    let inner = wkt
        .trim()
        .strip_prefix("POINT")?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;

    let mut parts = inner.split_whitespace();
    let lon: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    Some((lon, lat))
}

/// Konversi WKT hasil `ST_AsText` menjadi geometri GeoJSON. Mendukung
/// POINT, POLYGON, dan MULTIPOLYGON sesuai isi layer peta.
pub fn wkt_to_geometry(wkt: &str) -> Option<Geometry> {
    let wkt = wkt.trim();

    if wkt.starts_with("POINT") {
        let (lon, lat) = parse_wkt_point_opt(wkt)?;
        return Some(Geometry {
            geometry_type: "Point".to_string(),
            coordinates: serde_json::json!([lon, lat]),
        });
    }

    if let Some(body) = wkt.strip_prefix("POLYGON") {
        let rings = parse_rings(body.trim())?;
        return Some(Geometry {
            geometry_type: "Polygon".to_string(),
            coordinates: serde_json::to_value(rings).ok()?,
        });
    }

    if let Some(body) = wkt.strip_prefix("MULTIPOLYGON") {
        let body = body.trim().strip_prefix('(')?.strip_suffix(')')?;
        let mut polygons = Vec::new();
        for part in split_top_level(body) {
            polygons.push(parse_rings(part.trim())?);
        }
        return Some(Geometry {
            geometry_type: "MultiPolygon".to_string(),
            coordinates: serde_json::to_value(polygons).ok()?,
        });
    }

    None
}

/// `((x y, x y, ...), (x y, ...))` menjadi daftar ring.
fn parse_rings(body: &str) -> Option<Vec<Vec<[f64; 2]>>> {
    let body = body.strip_prefix('(')?.strip_suffix(')')?;
    let mut rings = Vec::new();

    for ring in split_top_level(body) {
        let ring = ring.trim();
        let ring = ring.strip_prefix('(').unwrap_or(ring);
        let ring = ring.strip_suffix(')').unwrap_or(ring);

        let mut coords = Vec::new();
        for pair in ring.split(',') {
            let mut nums = pair.split_whitespace();
            let lon: f64 = nums.next()?.parse().ok()?;
            let lat: f64 = nums.next()?.parse().ok()?;
            coords.push([lon, lat]);
        }
        rings.push(coords);
    }

    Some(rings)
}

/// Memecah pada koma kedalaman-nol, supaya koma di dalam ring tidak ikut
/// terpotong.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_wkt_round_trip() {
        let wkt = point_to_wkt(106.8456, -6.2088);
        assert_eq!(wkt, "POINT(106.8456 -6.2088)");
        assert_eq!(parse_wkt_point(&wkt), (106.8456, -6.2088));
    }

    #[test]
    fn broken_point_falls_back_to_origin() {
        assert_eq!(parse_wkt_point(""), (0.0, 0.0));
        assert_eq!(parse_wkt_point("POINT(abc def)"), (0.0, 0.0));
        assert_eq!(parse_wkt_point("LINESTRING(0 0, 1 1)"), (0.0, 0.0));
    }

    #[test]
    fn polygon_wkt_to_geometry() {
        let geom = wkt_to_geometry("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))").unwrap();
        assert_eq!(geom.geometry_type, "Polygon");
        assert_eq!(geom.coordinates[0][1], json!([4.0, 0.0]));
    }

    #[test]
    fn multipolygon_wkt_to_geometry() {
        let geom =
            wkt_to_geometry("MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))")
                .unwrap();
        assert_eq!(geom.geometry_type, "MultiPolygon");
        assert_eq!(geom.coordinates[1][0][0], json!([5.0, 5.0]));
    }

    #[test]
    fn feature_collection_serializes_with_type_tags() {
        let fc = FeatureCollection::new(vec![Feature::point(106.8, -6.2, json!({"id": "1"}))]);
        let value = serde_json::to_value(&fc).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "Point");
    }
}
