use crate::core::{CartItem, CartItemsRepository, CartItemsService, ReservationClient, Result};
use crate::utils::error::CartError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

/// Orchestrates cart reads and writes.
///
/// `add` returns as soon as the item is stored. The reservation for the item
/// runs afterwards in a detached task that is bounded by `reservation_timeout`
/// and never reports back to the caller: its outcome is only visible through
/// the logs and through the reservation id on later reads.
pub struct CartService<R: ?Sized, C: ?Sized> {
    repo: Arc<R>,
    client: Arc<C>,
    reservation_timeout: Duration,
    tracker: TaskTracker,
}

/// Where a reservation attempt stopped.
#[derive(Debug)]
enum ReservationFailure {
    Reserve(CartError),
    Store {
        reservation_id: String,
        source: CartError,
    },
}

impl<R, C> CartService<R, C>
where
    R: CartItemsRepository + ?Sized + 'static,
    C: ReservationClient + ?Sized + 'static,
{
    pub fn new(repo: Arc<R>, client: Arc<C>, reservation_timeout: Duration) -> Self {
        Self {
            repo,
            client,
            reservation_timeout,
            tracker: TaskTracker::new(),
        }
    }

    pub fn reservation_timeout(&self) -> Duration {
        self.reservation_timeout
    }

    /// Reservation tasks that have been spawned and not yet finished.
    pub fn pending_reservations(&self) -> usize {
        self.tracker.len()
    }

    pub async fn get(&self) -> Result<Vec<CartItem>> {
        self.repo.get().await
    }

    pub async fn add(&self, item: CartItem) -> Result<()> {
        self.repo.add(&item).await?;

        tracing::debug!(item_id = %item.id, "Item stored, scheduling reservation");
        self.spawn_reservation(item);
        Ok(())
    }

    fn spawn_reservation(&self, item: CartItem) {
        let repo = Arc::clone(&self.repo);
        let client = Arc::clone(&self.client);
        let budget = self.reservation_timeout;

        // Not tied to the caller: the task keeps running if the request future
        // that called `add` is dropped.
        self.tracker
            .spawn(async move { reserve_item(repo.as_ref(), client.as_ref(), item, budget).await });
    }

    /// Waits for in-flight reservations. Returns `false` if some were still
    /// running when `timeout` elapsed.
    pub async fn drain_reservations(&self, timeout: Duration) -> bool {
        self.tracker.close();

        tracing::info!(
            pending = self.tracker.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Waiting for pending reservations"
        );

        tokio::select! {
            _ = self.tracker.wait() => {
                tracing::info!("All pending reservations finished");
                true
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    pending = self.tracker.len(),
                    "Reservations still running after drain timeout"
                );
                false
            }
        }
    }
}

async fn reserve_item<R, C>(repo: &R, client: &C, item: CartItem, budget: Duration)
where
    R: CartItemsRepository + ?Sized,
    C: ReservationClient + ?Sized,
{
    // One budget covers the remote call and the write-back.
    match tokio::time::timeout(budget, reconcile(repo, client, &item)).await {
        Ok(Ok(reservation_id)) => {
            tracing::info!(
                item_id = %item.id,
                reservation_id = %reservation_id,
                "Item reserved"
            );
        }
        Ok(Err(ReservationFailure::Reserve(CartError::ReservationRejected { status, body }))) => {
            tracing::error!(
                item_id = %item.id,
                item_name = %item.name,
                status,
                response = %body,
                "Reservation service rejected the item"
            );
        }
        Ok(Err(ReservationFailure::Reserve(e))) => {
            tracing::error!(
                item_id = %item.id,
                item_name = %item.name,
                error = %e,
                "Reservation request failed"
            );
        }
        Ok(Err(ReservationFailure::Store {
            reservation_id,
            source,
        })) => {
            if source.is_not_found() {
                tracing::warn!(
                    item_id = %item.id,
                    item_name = %item.name,
                    reservation_id = %reservation_id,
                    "Reserved item no longer stored"
                );
            } else {
                tracing::error!(
                    item_id = %item.id,
                    item_name = %item.name,
                    reservation_id = %reservation_id,
                    error = %source,
                    "Could not store reservation id"
                );
            }
        }
        Err(_) => {
            tracing::error!(
                item_id = %item.id,
                item_name = %item.name,
                timeout_ms = budget.as_millis() as u64,
                "Reservation timed out"
            );
        }
    }
}

async fn reconcile<R, C>(
    repo: &R,
    client: &C,
    item: &CartItem,
) -> std::result::Result<String, ReservationFailure>
where
    R: CartItemsRepository + ?Sized,
    C: ReservationClient + ?Sized,
{
    let reservation_id = client
        .reserve(item)
        .await
        .map_err(ReservationFailure::Reserve)?;

    match repo.set_reservation_id(item, &reservation_id).await {
        Ok(()) => Ok(reservation_id),
        Err(source) => Err(ReservationFailure::Store {
            reservation_id,
            source,
        }),
    }
}

#[async_trait::async_trait]
impl<R, C> CartItemsService for CartService<R, C>
where
    R: CartItemsRepository + ?Sized + 'static,
    C: ReservationClient + ?Sized + 'static,
{
    async fn get(&self) -> Result<Vec<CartItem>> {
        CartService::get(self).await
    }

    async fn add(&self, item: CartItem) -> Result<()> {
        CartService::add(self, item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockRepository {
        items: Mutex<HashMap<String, CartItem>>,
        fail_get: bool,
        fail_add: bool,
        set_delay: Option<Duration>,
        set_calls: AtomicUsize,
    }

    impl MockRepository {
        fn failing_add() -> Self {
            Self {
                fail_add: true,
                ..Default::default()
            }
        }

        fn failing_get() -> Self {
            Self {
                fail_get: true,
                ..Default::default()
            }
        }

        fn slow_write_back(delay: Duration) -> Self {
            Self {
                set_delay: Some(delay),
                ..Default::default()
            }
        }

        async fn item(&self, id: &str) -> Option<CartItem> {
            self.items.lock().await.get(id).cloned()
        }

        fn set_calls(&self) -> usize {
            self.set_calls.load(Ordering::SeqCst)
        }
    }

    fn storage_error() -> CartError {
        CartError::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "random error",
        ))
    }

    #[async_trait::async_trait]
    impl CartItemsRepository for MockRepository {
        async fn get(&self) -> Result<Vec<CartItem>> {
            if self.fail_get {
                return Err(storage_error());
            }
            Ok(self.items.lock().await.values().cloned().collect())
        }

        async fn add(&self, item: &CartItem) -> Result<()> {
            if self.fail_add {
                return Err(storage_error());
            }
            let mut items = self.items.lock().await;
            items
                .entry(item.id.clone())
                .and_modify(|stored| stored.quantity += item.quantity)
                .or_insert_with(|| item.clone());
            Ok(())
        }

        async fn set_reservation_id(&self, item: &CartItem, reservation_id: &str) -> Result<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.set_delay {
                tokio::time::sleep(delay).await;
            }
            let mut items = self.items.lock().await;
            match items.get_mut(&item.id) {
                Some(stored) => {
                    stored.reservation_id = reservation_id.to_string();
                    Ok(())
                }
                None => Err(CartError::ItemNotFound {
                    id: item.id.clone(),
                }),
            }
        }
    }

    enum Behavior {
        Reserve(&'static str),
        Reject(u16),
        Hang(Duration),
    }

    struct MockClient {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockClient {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ReservationClient for MockClient {
        async fn reserve(&self, _item: &CartItem) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Reserve(id) => Ok(id.to_string()),
                Behavior::Reject(status) => Err(CartError::ReservationRejected {
                    status,
                    body: String::new(),
                }),
                Behavior::Hang(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok("tooLate".to_string())
                }
            }
        }
    }

    fn service(
        repo: &Arc<MockRepository>,
        client: &Arc<MockClient>,
        timeout: Duration,
    ) -> CartService<MockRepository, MockClient> {
        CartService::new(Arc::clone(repo), Arc::clone(client), timeout)
    }

    fn potato() -> CartItem {
        CartItem::new("1", "potato", 1)
    }

    #[tokio::test]
    async fn test_get_returns_repository_items() {
        let repo = Arc::new(MockRepository::default());
        repo.add(&potato()).await.unwrap();
        let client = Arc::new(MockClient::new(Behavior::Reserve("unused")));

        let items = service(&repo, &client, Duration::from_secs(5))
            .get()
            .await
            .unwrap();

        assert_eq!(items, vec![potato()]);
    }

    #[tokio::test]
    async fn test_get_propagates_repository_error() {
        let repo = Arc::new(MockRepository::failing_get());
        let client = Arc::new(MockClient::new(Behavior::Reserve("unused")));

        let result = service(&repo, &client, Duration::from_secs(5)).get().await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_add_failure_returns_error_without_reserving() {
        let repo = Arc::new(MockRepository::failing_add());
        let client = Arc::new(MockClient::new(Behavior::Reserve("fancyReservationId")));
        let svc = service(&repo, &client, Duration::from_secs(40));

        let result = svc.add(potato()).await;

        assert!(result.is_err());
        assert_eq!(svc.pending_reservations(), 0);
        assert!(svc.drain_reservations(Duration::from_secs(1)).await);
        assert_eq!(client.calls(), 0);
        assert_eq!(repo.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_success_writes_reservation_id() {
        let repo = Arc::new(MockRepository::default());
        let client = Arc::new(MockClient::new(Behavior::Reserve("fancyReservationId")));
        let svc = service(&repo, &client, Duration::from_secs(3));

        svc.add(potato()).await.unwrap();
        assert!(svc.drain_reservations(Duration::from_secs(5)).await);

        assert_eq!(client.calls(), 1);
        let stored = repo.item("1").await.unwrap();
        assert_eq!(stored.reservation_id, "fancyReservationId");
        assert_eq!(stored.quantity, 1);
    }

    #[tokio::test]
    async fn test_rejected_reservation_leaves_item_unreserved() {
        let repo = Arc::new(MockRepository::default());
        let client = Arc::new(MockClient::new(Behavior::Reject(404)));
        let svc = service(&repo, &client, Duration::from_secs(40));

        assert!(svc.add(potato()).await.is_ok());
        assert!(svc.drain_reservations(Duration::from_secs(5)).await);

        assert_eq!(client.calls(), 1);
        assert_eq!(repo.set_calls(), 0);
        assert!(!repo.item("1").await.unwrap().is_reserved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservation_timeout_skips_write_back() {
        let repo = Arc::new(MockRepository::default());
        let client = Arc::new(MockClient::new(Behavior::Hang(Duration::from_secs(4))));
        let svc = service(&repo, &client, Duration::from_secs(1));
        assert_eq!(svc.reservation_timeout(), Duration::from_secs(1));

        assert!(svc.add(potato()).await.is_ok());
        assert!(svc.drain_reservations(Duration::from_secs(10)).await);

        assert_eq!(client.calls(), 1);
        assert_eq!(repo.set_calls(), 0);
        assert!(!repo.item("1").await.unwrap().is_reserved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservation_timeout_cuts_off_slow_write_back() {
        let repo = Arc::new(MockRepository::slow_write_back(Duration::from_secs(10)));
        let client = Arc::new(MockClient::new(Behavior::Reserve("R1")));
        let svc = service(&repo, &client, Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        svc.add(potato()).await.unwrap();
        assert!(svc.drain_reservations(Duration::from_secs(30)).await);

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(client.calls(), 1);
        assert_eq!(repo.set_calls(), 1);
        assert!(!repo.item("1").await.unwrap().is_reserved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_returns_before_reservation_completes() {
        let repo = Arc::new(MockRepository::default());
        let client = Arc::new(MockClient::new(Behavior::Hang(Duration::from_secs(60))));
        let svc = service(&repo, &client, Duration::from_secs(120));

        svc.add(potato()).await.unwrap();

        assert_eq!(svc.pending_reservations(), 1);
        assert!(!repo.item("1").await.unwrap().is_reserved());

        assert!(svc.drain_reservations(Duration::from_secs(90)).await);
        assert_eq!(repo.item("1").await.unwrap().reservation_id, "tooLate");
    }

    #[tokio::test]
    async fn test_missing_item_on_write_back_is_absorbed() {
        let repo = Arc::new(MockRepository::default());
        let client = Arc::new(MockClient::new(Behavior::Reserve("R1")));

        // The item was never stored, as if it was removed after `add`.
        reserve_item(repo.as_ref(), client.as_ref(), potato(), Duration::from_secs(1)).await;

        assert_eq!(repo.set_calls(), 1);
        assert!(repo.item("1").await.is_none());
    }
}
