// Adapters layer: concrete implementations for external systems (storage, http in/out).

pub mod http_handler;
pub mod memory_repository;
pub mod mysql_repository;
pub mod reservation_client;
