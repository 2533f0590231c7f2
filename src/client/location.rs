use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::client::error::ClientError;
use crate::models::location::GeoPoint;

/// Platform location services as seen by the gate.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether the user granted location permission to the app.
    async fn permission_granted(&self) -> Result<bool, ClientError>;

    /// Whether device-wide location services are switched on.
    async fn services_enabled(&self) -> Result<bool, ClientError>;

    async fn current_position(&self) -> Result<GeoPoint, ClientError>;
}

/// A provider reporting a fixed, movable position with switchable
/// permission and service flags.
#[derive(Debug)]
pub struct StaticLocation {
    position: Mutex<GeoPoint>,
    permission: AtomicBool,
    services: AtomicBool,
}

impl StaticLocation {
    pub fn new(position: GeoPoint) -> Self {
        Self {
            position: Mutex::new(position),
            permission: AtomicBool::new(true),
            services: AtomicBool::new(true),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn set_services_enabled(&self, enabled: bool) {
        self.services.store(enabled, Ordering::SeqCst);
    }

    pub fn move_to(&self, position: GeoPoint) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn permission_granted(&self) -> Result<bool, ClientError> {
        Ok(self.permission.load(Ordering::SeqCst))
    }

    async fn services_enabled(&self) -> Result<bool, ClientError> {
        Ok(self.services.load(Ordering::SeqCst))
    }

    async fn current_position(&self) -> Result<GeoPoint, ClientError> {
        if !self.permission.load(Ordering::SeqCst) {
            return Err(ClientError::Location("permission denied".to_string()));
        }
        if !self.services.load(Ordering::SeqCst) {
            return Err(ClientError::Location("location services are off".to_string()));
        }

        Ok(*self.position.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
