pub mod server;

pub use server::{build_repository, build_service, serve, serve_with_listener, ConfiguredCartService};
