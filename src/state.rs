use std::path::PathBuf;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::token::TokenService;
use crate::config::Config;
use crate::models::delivery_person::DeliveryPerson;
use crate::models::event::DeliveryEvent;
use crate::models::location::LocationSample;
use crate::models::order::Order;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub delivery_persons: DashMap<Uuid, DeliveryPerson>,
    pub email_index: DashMap<String, Uuid>,
    pub phone_index: DashMap<u64, Uuid>,
    pub orders: DashMap<Uuid, Order>,
    pub location_samples: DashMap<Uuid, LocationSample>,
    /// Logged-out tokens mapped to their own expiry.
    pub revoked_tokens: DashMap<String, i64>,
    pub tokens: TokenService,
    pub events_tx: broadcast::Sender<DeliveryEvent>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub arrival_radius_meters: f64,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            delivery_persons: DashMap::new(),
            email_index: DashMap::new(),
            phone_index: DashMap::new(),
            orders: DashMap::new(),
            location_samples: DashMap::new(),
            revoked_tokens: DashMap::new(),
            tokens: TokenService::new(&config.jwt_secret, Duration::days(config.token_ttl_days)),
            events_tx,
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            arrival_radius_meters: config.arrival_radius_meters,
            metrics: Metrics::new(),
        }
    }

    /// Best effort: having no `/ws` subscribers is not an error.
    pub fn publish(&self, event: DeliveryEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn revoke_token(&self, token: String, expires_at: i64) {
        let now = Utc::now().timestamp();
        self.revoked_tokens.retain(|_, expiry| *expiry > now);
        self.revoked_tokens.insert(token, expires_at);
    }

    pub fn is_token_revoked(&self, token: &str) -> bool {
        self.revoked_tokens.contains_key(token)
    }

    pub fn refresh_active_gauge(&self) {
        let active = self
            .delivery_persons
            .iter()
            .filter(|entry| entry.value().status.is_active())
            .count();
        self.metrics.active_delivery_persons.set(active as i64);
    }
}
