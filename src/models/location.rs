use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One location ping from a delivery person. Samples are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
    pub id: Uuid,
    pub delivery_person_id: Uuid,
    pub position: GeoPoint,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReceipt {
    pub message: String,
    pub timestamp: i64,
    pub updated_orders: usize,
}
