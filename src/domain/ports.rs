use crate::domain::model::CartItem;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Durable storage for cart items. Shared by request handlers and background
/// reservation tasks, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait CartItemsRepository: Send + Sync {
    async fn get(&self) -> Result<Vec<CartItem>>;

    /// Upserts by id; an existing item's quantity is incremented.
    async fn add(&self, item: &CartItem) -> Result<()>;

    /// Fails with `CartError::ItemNotFound` when no stored item has `item.id`.
    async fn set_reservation_id(&self, item: &CartItem, reservation_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ReservationClient: Send + Sync {
    /// Returns a non-empty reservation id. Dropping the future abandons the call.
    async fn reserve(&self, item: &CartItem) -> Result<String>;
}

#[async_trait]
pub trait CartItemsService: Send + Sync {
    async fn get(&self) -> Result<Vec<CartItem>>;
    async fn add(&self, item: CartItem) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn listen_addr(&self) -> &str;
    fn reservation_endpoint(&self) -> &str;
    fn reservation_timeout(&self) -> Duration;
    fn shutdown_timeout(&self) -> Duration;
}
