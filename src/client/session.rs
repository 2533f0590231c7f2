use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::client::api::DeliveryApi;
use crate::client::error::ClientError;
use crate::models::delivery_person::{AvailabilityStatus, DeliveryPersonView};
use crate::models::location::{GeoPoint, TrackReceipt};

/// One logged-in delivery person.
///
/// Created by [`Session::login`] and shared by `Arc` with the location gate
/// and the order console. The latest known profile is published on a watch
/// channel so observers see availability flips as soon as any component
/// refreshes it.
pub struct Session {
    api: Arc<dyn DeliveryApi>,
    token: String,
    profile: watch::Sender<DeliveryPersonView>,
}

impl Session {
    pub async fn login(
        api: Arc<dyn DeliveryApi>,
        email: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let response = api.login(email, password).await?;
        info!(
            delivery_person_id = %response.delivery_person.id,
            status = %response.delivery_person.status,
            "logged in"
        );

        let (profile, _) = watch::channel(response.delivery_person);
        Ok(Self {
            api,
            token: response.token,
            profile,
        })
    }

    pub fn api(&self) -> &dyn DeliveryApi {
        self.api.as_ref()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn profile(&self) -> DeliveryPersonView {
        self.profile.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.profile.borrow().status.is_active()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeliveryPersonView> {
        self.profile.subscribe()
    }

    pub async fn refresh_profile(&self) -> Result<DeliveryPersonView, ClientError> {
        let profile = self.api.profile(&self.token).await?;
        self.profile.send_replace(profile.clone());
        Ok(profile)
    }

    pub async fn set_availability(
        &self,
        status: AvailabilityStatus,
    ) -> Result<DeliveryPersonView, ClientError> {
        let profile = self.api.set_availability(&self.token, status).await?;
        self.profile.send_replace(profile.clone());
        Ok(profile)
    }

    pub async fn report_location_status(
        &self,
        is_location_on: bool,
    ) -> Result<DeliveryPersonView, ClientError> {
        let profile = self.api.set_location_status(&self.token, is_location_on).await?;
        self.profile.send_replace(profile.clone());
        Ok(profile)
    }

    pub async fn track_location(&self, position: GeoPoint) -> Result<TrackReceipt, ClientError> {
        self.api.track_location(&self.token, position).await
    }

    /// Revokes the token server-side. The session must not be used afterwards.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.api.logout(&self.token).await?;
        info!(delivery_person_id = %self.profile.borrow().id, "logged out");
        Ok(())
    }
}
