pub mod cart_service;

pub use crate::domain::model::CartItem;
pub use crate::domain::ports::{
    CartItemsRepository, CartItemsService, ConfigProvider, ReservationClient,
};
pub use crate::utils::error::Result;
