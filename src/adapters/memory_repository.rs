use crate::core::{CartItem, CartItemsRepository, Result};
use crate::utils::error::CartError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local cart storage. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCartItemsRepository {
    items: RwLock<HashMap<String, CartItem>>,
}

impl InMemoryCartItemsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartItemsRepository for InMemoryCartItemsRepository {
    async fn get(&self) -> Result<Vec<CartItem>> {
        let items = self.items.read().await;
        Ok(items.values().cloned().collect())
    }

    async fn add(&self, item: &CartItem) -> Result<()> {
        let mut items = self.items.write().await;
        match items.get_mut(&item.id) {
            Some(stored) => {
                stored.quantity = stored.quantity.checked_add(item.quantity).ok_or_else(|| {
                    CartError::MalformedData {
                        message: format!("quantity overflow for item {}", item.id),
                    }
                })?;
            }
            None => {
                // Reservation ids only come from the reservation service.
                let mut stored = item.clone();
                stored.reservation_id.clear();
                items.insert(item.id.clone(), stored);
            }
        }
        Ok(())
    }

    async fn set_reservation_id(&self, item: &CartItem, reservation_id: &str) -> Result<()> {
        let mut items = self.items.write().await;
        let stored = items
            .get_mut(&item.id)
            .ok_or_else(|| CartError::ItemNotFound {
                id: item.id.clone(),
            })?;
        stored.reservation_id = reservation_id.to_string();
        Ok(())
    }
}
