use crate::adapters::http_handler::app_router;
use crate::adapters::memory_repository::InMemoryCartItemsRepository;
use crate::adapters::mysql_repository::MySqlCartItemsRepository;
use crate::adapters::reservation_client::HttpReservationClient;
use crate::config::toml_config::{AppConfig, StorageConfig, StorageKind};
use crate::core::cart_service::CartService;
use crate::core::{CartItemsRepository, ConfigProvider};
use crate::utils::error::{CartError, Result};
use crate::utils::validation::{validate_required_field, validate_socket_addr};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// The cart service as wired by configuration: storage chosen at runtime,
/// reservations over HTTP.
pub type ConfiguredCartService = CartService<dyn CartItemsRepository, HttpReservationClient>;

pub async fn build_repository(storage: &StorageConfig) -> Result<Arc<dyn CartItemsRepository>> {
    match storage.kind {
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage, cart contents will not survive a restart");
            Ok(Arc::new(InMemoryCartItemsRepository::new()))
        }
        StorageKind::Mysql => {
            let url = validate_required_field("storage.url", &storage.url)?;
            let repo = MySqlCartItemsRepository::connect(url, storage.max_connections()).await?;
            repo.ensure_schema().await?;
            Ok(Arc::new(repo))
        }
    }
}

pub async fn build_service(config: &AppConfig) -> Result<Arc<ConfiguredCartService>> {
    let repo = build_repository(&config.storage).await?;
    let client = Arc::new(HttpReservationClient::new(config.reservation_endpoint()));

    let reservation_url = client.reserve_url().to_string();
    let service = CartService::new(repo, client, config.reservation_timeout());

    tracing::info!(
        reservation_url = %reservation_url,
        reservation_timeout_ms = service.reservation_timeout().as_millis() as u64,
        "Cart service configured"
    );

    Ok(Arc::new(service))
}

pub async fn serve<F>(
    config: &AppConfig,
    service: Arc<ConfiguredCartService>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = validate_socket_addr("server.listen_addr", config.listen_addr())?;
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener, service, config.shutdown_timeout(), shutdown).await
}

/// Serves until `shutdown` resolves, then gives in-flight requests and
/// pending reservations up to `shutdown_timeout` each to finish.
pub async fn serve_with_listener<F>(
    listener: TcpListener,
    service: Arc<ConfiguredCartService>,
    shutdown_timeout: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app_router(service.clone())).with_graceful_shutdown(
        async move {
            shutdown.await;
            let _ = signalled_tx.send(());
        },
    );
    let mut handle = tokio::spawn(async move { server.await });

    let served = tokio::select! {
        result = &mut handle => result,
        _ = signalled_rx => {
            tracing::info!("Shutdown requested, waiting for open requests");
            match tokio::time::timeout(shutdown_timeout, &mut handle).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!("Forcing shutdown");
                    handle.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    service.drain_reservations(shutdown_timeout).await;

    served
        .map_err(|e| CartError::IoError(std::io::Error::other(e)))?
        .map_err(CartError::IoError)?;

    tracing::info!("Stopped");
    Ok(())
}
