use crate::core::{CartItem, ReservationClient, Result};
use crate::domain::model::{ReservationRequest, ReservationResponse};
use crate::utils::error::CartError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

/// Talks to the reservation service over HTTP: `POST {endpoint}/reserve`.
#[derive(Debug, Clone)]
pub struct HttpReservationClient {
    client: Client,
    reserve_url: String,
}

impl HttpReservationClient {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            reserve_url: format!("{}/reserve", endpoint.trim_end_matches('/')),
        }
    }

    pub fn reserve_url(&self) -> &str {
        &self.reserve_url
    }
}

#[async_trait]
impl ReservationClient for HttpReservationClient {
    async fn reserve(&self, item: &CartItem) -> Result<String> {
        let request = ReservationRequest::new(item.clone());

        tracing::debug!(item_id = %item.id, url = %self.reserve_url, "Requesting reservation");
        let response = self
            .client
            .post(&self.reserve_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(item_id = %item.id, status = %status, "Reservation response received");

        if status != StatusCode::OK {
            return Err(CartError::ReservationRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ReservationResponse = serde_json::from_str(&body)?;
        if parsed.reservation_id.is_empty() {
            return Err(CartError::InvalidReservationResponse {
                message: format!("empty reservation id in {}", body),
            });
        }

        Ok(parsed.reservation_id)
    }
}
