use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    /// Empty until the reservation service has granted one.
    #[serde(rename = "reservationId", default)]
    pub reservation_id: String,
}

impl CartItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            reservation_id: String::new(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        !self.reservation_id.is_empty()
    }
}

impl Validate for CartItem {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("item.id", &self.id)?;
        validate_positive_number("item.quantity", u64::from(self.quantity), 1)
    }
}

/// Inbound body of `POST /items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub version: String,
    pub item: CartItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCartItemsResponse {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Items")]
    pub items: Vec<CartItem>,
}

impl GetCartItemsResponse {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self {
            version: API_VERSION.to_string(),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub version: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            version: API_VERSION.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub version: String,
    pub item: CartItem,
}

impl ReservationRequest {
    pub fn new(item: CartItem) -> Self {
        Self {
            version: API_VERSION.to_string(),
            item,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub version: String,
    #[serde(rename = "reservationId")]
    pub reservation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_request_wire_format() {
        let request = ReservationRequest::new(CartItem::new("1", "potato", 1));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"version":"1.0.0","item":{"id":"1","name":"potato","quantity":1,"reservationId":""}}"#
        );
    }

    #[test]
    fn test_cart_item_without_reservation_id_deserializes() {
        let item: CartItem =
            serde_json::from_str(r#"{"id":"1","name":"fancy pants","quantity":2}"#).unwrap();
        assert_eq!(item, CartItem::new("1", "fancy pants", 2));
        assert!(!item.is_reserved());
    }

    #[test]
    fn test_get_response_uses_capitalized_keys() {
        let mut item = CartItem::new("1", "pants", 1);
        item.reservation_id = "reservationId1".to_string();
        let json = serde_json::to_value(GetCartItemsResponse::new(vec![item])).unwrap();
        assert_eq!(json["Version"], "1.0.0");
        assert_eq!(json["Items"][0]["reservationId"], "reservationId1");
    }

    #[test]
    fn test_cart_item_validation() {
        assert!(CartItem::new("1", "pants", 1).validate().is_ok());
        assert!(CartItem::new("", "pants", 1).validate().is_err());
        assert!(CartItem::new("1", "pants", 0).validate().is_err());
    }
}
