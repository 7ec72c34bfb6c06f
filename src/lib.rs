pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{
    http_handler::app_router, memory_repository::InMemoryCartItemsRepository,
    mysql_repository::MySqlCartItemsRepository, reservation_client::HttpReservationClient,
};
pub use config::toml_config::AppConfig;
pub use core::cart_service::CartService;
pub use domain::model::CartItem;
pub use utils::error::{CartError, Result};
