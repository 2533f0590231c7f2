use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::models::delivery_person::{AvailabilityStatus, DeliveryPersonView, LoginResponse};
use crate::models::location::{GeoPoint, TrackReceipt};
use crate::models::order::{
    CompletionReceipt, OrderStats, OrderStatus, OrderView, StatusUpdateReceipt,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A proof-of-delivery photo ready for upload.
#[derive(Debug, Clone)]
pub struct ProofImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ProofImage {
    pub fn jpeg(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "image/jpeg".to_string(),
            bytes,
        }
    }
}

/// The backend surface a delivery client consumes. Every call except
/// `login` carries the session's bearer token.
#[async_trait]
pub trait DeliveryApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError>;
    async fn logout(&self, token: &str) -> Result<(), ClientError>;
    async fn profile(&self, token: &str) -> Result<DeliveryPersonView, ClientError>;
    async fn set_availability(
        &self,
        token: &str,
        status: AvailabilityStatus,
    ) -> Result<DeliveryPersonView, ClientError>;
    async fn set_location_status(
        &self,
        token: &str,
        is_location_on: bool,
    ) -> Result<DeliveryPersonView, ClientError>;
    async fn track_location(&self, token: &str, position: GeoPoint) -> Result<TrackReceipt, ClientError>;
    async fn current_orders(&self, token: &str) -> Result<Vec<OrderView>, ClientError>;
    async fn update_order_status(
        &self,
        token: &str,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, ClientError>;
    async fn complete_order(
        &self,
        token: &str,
        order_id: Uuid,
        proof: ProofImage,
    ) -> Result<CompletionReceipt, ClientError>;
    async fn order_stats(&self, token: &str) -> Result<OrderStats, ClientError>;
}

/// [`DeliveryApi`] over HTTP. `base_url` points at the `/api` prefix, e.g.
/// `http://127.0.0.1:8000/api`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::Unauthorized(message))
    } else {
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DeliveryApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = json!({ "email": email, "password": password });
        self.send(self.client.post(self.url("/login")).json(&body))
            .await
    }

    async fn logout(&self, token: &str) -> Result<(), ClientError> {
        let _: Value = self
            .send(self.client.post(self.url("/logout")).bearer_auth(token))
            .await?;
        Ok(())
    }

    async fn profile(&self, token: &str) -> Result<DeliveryPersonView, ClientError> {
        self.send(self.client.get(self.url("/profile")).bearer_auth(token))
            .await
    }

    async fn set_availability(
        &self,
        token: &str,
        status: AvailabilityStatus,
    ) -> Result<DeliveryPersonView, ClientError> {
        let request = self
            .client
            .patch(self.url("/delivery-person/status"))
            .bearer_auth(token)
            .json(&json!({ "status": status }));
        self.send(request).await
    }

    async fn set_location_status(
        &self,
        token: &str,
        is_location_on: bool,
    ) -> Result<DeliveryPersonView, ClientError> {
        let request = self
            .client
            .patch(self.url("/delivery-person/location-status"))
            .bearer_auth(token)
            .json(&json!({ "is_location_on": is_location_on }));
        self.send(request).await
    }

    async fn track_location(&self, token: &str, position: GeoPoint) -> Result<TrackReceipt, ClientError> {
        let request = self
            .client
            .post(self.url("/location/track"))
            .bearer_auth(token)
            .json(&position);
        self.send(request).await
    }

    async fn current_orders(&self, token: &str) -> Result<Vec<OrderView>, ClientError> {
        self.send(self.client.get(self.url("/orders/current")).bearer_auth(token))
            .await
    }

    async fn update_order_status(
        &self,
        token: &str,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, ClientError> {
        let request = self
            .client
            .patch(self.url(&format!("/orders/{order_id}/status")))
            .bearer_auth(token)
            .query(&[("status", status.as_str())]);
        let receipt: StatusUpdateReceipt = self.send(request).await?;
        Ok(receipt.order)
    }

    async fn complete_order(
        &self,
        token: &str,
        order_id: Uuid,
        proof: ProofImage,
    ) -> Result<CompletionReceipt, ClientError> {
        let part = Part::bytes(proof.bytes)
            .file_name(proof.file_name)
            .mime_str(&proof.content_type)?;
        let request = self
            .client
            .post(self.url(&format!("/orders/{order_id}/complete")))
            .bearer_auth(token)
            .multipart(Form::new().part("file", part));
        self.send(request).await
    }

    async fn order_stats(&self, token: &str) -> Result<OrderStats, ClientError> {
        self.send(self.client.get(self.url("/stats/orders")).bearer_auth(token))
            .await
    }
}
