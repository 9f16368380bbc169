// src/models/sufferer.rs
use crate::models::geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Baris tabel `sufferer`, umpan peta lama yang masih dipakai frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sufferer {
    pub id: String,
    pub name: String,
    pub nik: String,
    pub date_of_birth: String,
    /// [longitude, latitude]
    pub coordinates: [f64; 2],
    pub status: String,
    pub reported_by_id: String,
}

impl Sufferer {
    pub fn to_feature(&self) -> Feature {
        Feature::point(
            self.coordinates[0],
            self.coordinates[1],
            json!({
                "id": self.id,
                "name": self.name,
                "nik": self.nik,
                "date_of_birth": self.date_of_birth,
                "status": self.status,
                "reported_by_id": self.reported_by_id,
            }),
        )
    }
}

pub fn to_feature_collection(sufferers: &[Sufferer]) -> FeatureCollection {
    FeatureCollection::new(sufferers.iter().map(Sufferer::to_feature).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sufferers_become_point_features() {
        let sufferer = Sufferer {
            id: "a1".to_string(),
            name: "Andi".to_string(),
            nik: "3175090101230001".to_string(),
            date_of_birth: "2023-01-01".to_string(),
            coordinates: [106.8, -6.2],
            status: "stunting".to_string(),
            reported_by_id: "3".to_string(),
        };

        let fc = to_feature_collection(&[sufferer]);
        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(feature.geometry.geometry_type, "Point");
        assert_eq!(feature.properties["nik"], "3175090101230001");
        assert_eq!(feature.geometry.coordinates[0], 106.8);
    }

    #[test]
    fn empty_input_gives_empty_collection() {
        let fc = to_feature_collection(&[]);
        assert_eq!(fc.collection_type, "FeatureCollection");
        assert!(fc.features.is_empty());
    }
}
