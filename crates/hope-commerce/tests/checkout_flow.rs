//! End-to-end checkout behaviour against in-memory gateways and stores.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::watch;

use hope_cache::{
    Cache, CacheError, FileStore, IdempotencyKey, IdempotencyKeys, KvStore, ManualClock,
    MemoryStore,
};
use hope_commerce::api::{ApiClient, ApiError, OrderGateway};
use hope_commerce::cart::{CartItem, CartStore, CART_STORAGE_KEY};
use hope_commerce::checkout::{
    CheckoutFlow, CheckoutState, Order, OrderRequest, OrderStatus, DEFAULT_ORDER_CONTEXT,
    GENERIC_CHECKOUT_FAILURE,
};
use hope_commerce::{CommerceError, ItemId, Money, OrderId, UserId};
use hope_data::{FetchClient, FetchError, Response, ScriptedTransport};

#[derive(Default)]
struct MockGateway {
    outcomes: Mutex<VecDeque<Result<Order, ApiError>>>,
    calls: Mutex<Vec<(OrderRequest, IdempotencyKey)>>,
    watcher: Mutex<Option<watch::Receiver<CheckoutState>>>,
    seen_states: Mutex<Vec<CheckoutState>>,
    /// Flipped on when a call arrives, to break storage mid-checkout.
    break_on_call: Mutex<Option<Arc<AtomicBool>>>,
}

impl MockGateway {
    fn succeed(&self) {
        self.outcomes.lock().unwrap().push_back(Ok(order(1)));
    }

    fn fail(&self, error: ApiError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    fn keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, key)| key.as_str().to_string())
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderGateway for MockGateway {
    async fn create_order(
        &self,
        order: &OrderRequest,
        key: &IdempotencyKey,
    ) -> Result<Order, ApiError> {
        if let Some(watcher) = self.watcher.lock().unwrap().as_ref() {
            self.seen_states.lock().unwrap().push(*watcher.borrow());
        }
        if let Some(flag) = self.break_on_call.lock().unwrap().as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push((order.clone(), key.clone()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport(FetchError::Timeout)))
    }
}

fn order(id: u64) -> Order {
    Order {
        id: OrderId::new(id),
        user_id: UserId::new(7),
        total_amount: Money::from_cents(2550),
        status: OrderStatus::Pending,
        shipping_address: None,
        items: Vec::new(),
        created_at: None,
        jobs: None,
    }
}

/// Store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: Arc<AtomicBool>,
}

impl KvStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::StoreError("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys()
    }
}

fn flaky_harness() -> (Harness, Arc<AtomicBool>) {
    let store = Arc::new(FlakyStore::default());
    let fail_writes = store.fail_writes.clone();
    let cache = Cache::from_shared(store);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
    ));
    let keys = IdempotencyKeys::new(cache.clone()).with_clock(clock.clone());
    let gateway = Arc::new(MockGateway::default());
    let flow = CheckoutFlow::new(gateway.clone(), keys);
    let cart = CartStore::open(cache.clone()).unwrap();
    let harness = Harness {
        cache,
        clock,
        gateway,
        cart,
        flow,
    };
    (harness, fail_writes)
}

fn server_error() -> ApiError {
    ApiError::Rejected {
        status: 500,
        message: None,
        details: None,
    }
}

struct Harness {
    cache: Cache,
    clock: Arc<ManualClock>,
    gateway: Arc<MockGateway>,
    cart: CartStore,
    flow: CheckoutFlow,
}

impl Harness {
    fn new() -> Self {
        let cache = Cache::in_memory();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
        ));
        let keys = IdempotencyKeys::new(cache.clone()).with_clock(clock.clone());
        let gateway = Arc::new(MockGateway::default());
        let flow = CheckoutFlow::new(gateway.clone(), keys);
        let cart = CartStore::open(cache.clone()).unwrap();
        Self {
            cache,
            clock,
            gateway,
            cart,
            flow,
        }
    }

    fn fill_cart(&mut self) {
        self.cart
            .add_item(
                CartItem::new(ItemId::new(1), "Rice", Money::from_cents(1000)),
                2,
            )
            .unwrap();
        self.cart
            .add_item(
                CartItem::new(ItemId::new(2), "Beans", Money::from_cents(550)),
                1,
            )
            .unwrap();
    }

    fn stored_key(&self) -> Option<IdempotencyKey> {
        IdempotencyKeys::new(self.cache.clone())
            .with_clock(self.clock.clone())
            .retrieve_key(DEFAULT_ORDER_CONTEXT)
            .unwrap()
    }

    fn record_exists(&self) -> bool {
        self.cache
            .exists(&format!("idempotency-{}", DEFAULT_ORDER_CONTEXT))
            .unwrap()
    }
}

#[tokio::test]
async fn empty_cart_never_reaches_the_network() {
    let mut h = Harness::new();

    let err = h.flow.submit(&mut h.cart, None).await.unwrap_err();

    assert!(matches!(err, CommerceError::EmptyCart));
    assert_eq!(h.gateway.call_count(), 0);
    assert_eq!(h.flow.state(), CheckoutState::Idle);
    assert!(!h.record_exists());
    assert!(!h.flow.can_submit(&h.cart));
}

#[tokio::test]
async fn success_clears_cart_and_forgets_key() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.succeed();

    let placed = h
        .flow
        .submit(&mut h.cart, Some("12 Elm St".to_string()))
        .await
        .unwrap();

    assert_eq!(placed.id, OrderId::new(1));
    assert!(h.cart.is_empty());
    assert!(!h.record_exists());
    assert_eq!(h.flow.state(), CheckoutState::Success);
    assert_eq!(h.flow.last_order().map(|o| o.id), Some(OrderId::new(1)));
    assert!(h.flow.last_error().is_none());

    let calls = h.gateway.calls.lock().unwrap();
    let (request, _) = &calls[0];
    let lines: Vec<(u64, i64)> = request
        .items
        .iter()
        .map(|l| (l.inventory_item_id.get(), l.quantity))
        .collect();
    assert_eq!(lines, vec![(1, 2), (2, 1)]);
    assert_eq!(request.shipping_address.as_deref(), Some("12 Elm St"));

    // The cleared cart is what a fresh process sees.
    let reopened = CartStore::open(h.cache.clone()).unwrap();
    assert!(reopened.is_empty());
}

#[tokio::test]
async fn server_failure_keeps_cart_and_key_for_retry() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.fail(server_error());
    h.gateway.succeed();

    let err = h.flow.submit(&mut h.cart, None).await.unwrap_err();
    assert_eq!(err.user_message(GENERIC_CHECKOUT_FAILURE), GENERIC_CHECKOUT_FAILURE);
    assert_eq!(h.flow.state(), CheckoutState::Idle);
    assert_eq!(h.flow.last_error(), Some(GENERIC_CHECKOUT_FAILURE));
    assert_eq!(h.cart.len(), 2);
    assert_eq!(h.cart.total().unwrap(), Money::from_cents(2550));

    let kept = h.stored_key().expect("key kept after server failure");

    h.flow.submit(&mut h.cart, None).await.unwrap();

    let keys = h.gateway.keys();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
    assert_eq!(keys[0], kept.as_str());
    assert!(h.cart.is_empty());
}

#[tokio::test]
async fn transport_failure_reuses_key() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.fail(ApiError::Transport(FetchError::RequestError(
        "connection refused".to_string(),
    )));
    h.gateway.fail(ApiError::Transport(FetchError::Timeout));

    assert!(h.flow.submit(&mut h.cart, None).await.is_err());
    assert!(h.flow.submit(&mut h.cart, None).await.is_err());

    let keys = h.gateway.keys();
    assert_eq!(keys[0], keys[1]);
    assert_eq!(h.cart.len(), 2);
}

#[tokio::test]
async fn client_rejection_surfaces_message_and_drops_key() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.fail(ApiError::Rejected {
        status: 400,
        message: Some("Insufficient quantity for item Rice".to_string()),
        details: None,
    });
    h.gateway.succeed();

    let err = h.flow.submit(&mut h.cart, None).await.unwrap_err();
    assert_eq!(
        err.user_message(GENERIC_CHECKOUT_FAILURE),
        "Insufficient quantity for item Rice"
    );
    assert_eq!(
        h.flow.last_error(),
        Some("Insufficient quantity for item Rice")
    );
    assert_eq!(h.cart.len(), 2);
    assert!(!h.record_exists());

    h.cart.update_quantity(ItemId::new(1), 1).unwrap();
    h.flow.submit(&mut h.cart, None).await.unwrap();

    let keys = h.gateway.keys();
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn changed_cart_after_failure_gets_new_key() {
    let mut h = Harness::new();
    h.cart
        .add_item(CartItem::new(ItemId::new(1), "Rice", Money::from_cents(1000)), 1)
        .unwrap();
    h.gateway.fail(ApiError::Transport(FetchError::Timeout));
    h.gateway.succeed();

    h.flow.submit(&mut h.cart, None).await.unwrap_err();
    let first = h.stored_key().expect("key kept after timeout");

    h.cart
        .add_item(CartItem::new(ItemId::new(2), "Beans", Money::from_cents(550)), 3)
        .unwrap();
    h.flow.submit(&mut h.cart, None).await.unwrap();

    let calls = h.gateway.calls.lock().unwrap();
    assert_eq!(calls[0].0.items.len(), 1);
    assert_eq!(calls[1].0.items.len(), 2);
    assert_eq!(calls[0].1, first);
    assert_ne!(calls[0].1, calls[1].1);
}

#[tokio::test]
async fn changed_address_after_failure_gets_new_key() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.fail(server_error());
    h.gateway.fail(server_error());
    h.gateway.fail(server_error());

    h.flow
        .submit(&mut h.cart, Some("12 Elm St".to_string()))
        .await
        .unwrap_err();
    h.flow
        .submit(&mut h.cart, Some("12 Elm St".to_string()))
        .await
        .unwrap_err();
    h.flow
        .submit(&mut h.cart, Some("40 Oak Ave".to_string()))
        .await
        .unwrap_err();

    let keys = h.gateway.keys();
    assert_eq!(keys[0], keys[1]);
    assert_ne!(keys[1], keys[2]);
}

#[tokio::test]
async fn unavailable_key_storage_blocks_submit() {
    let (mut h, fail_writes) = flaky_harness();
    h.fill_cart();
    h.gateway.succeed();
    let rx = h.flow.subscribe();
    fail_writes.store(true, Ordering::SeqCst);

    let err = h.flow.submit(&mut h.cart, None).await.unwrap_err();

    assert!(matches!(err, CommerceError::Storage(_)));
    assert_eq!(h.flow.last_error(), Some(GENERIC_CHECKOUT_FAILURE));
    assert_eq!(h.flow.state(), CheckoutState::Idle);
    assert!(!rx.has_changed().unwrap());
    assert_eq!(h.gateway.call_count(), 0);
    assert_eq!(h.cart.len(), 2);
    assert!(!h.record_exists());
}

#[tokio::test]
async fn placed_order_with_stuck_cart_keeps_key() {
    let (mut h, fail_writes) = flaky_harness();
    h.fill_cart();
    h.gateway.succeed();
    h.gateway.succeed();
    *h.gateway.break_on_call.lock().unwrap() = Some(fail_writes.clone());

    let placed = h.flow.submit(&mut h.cart, None).await.unwrap();

    assert_eq!(placed.id, OrderId::new(1));
    assert_eq!(h.flow.state(), CheckoutState::Success);
    assert!(h.flow.last_error().is_none());
    assert_eq!(h.cart.len(), 2);
    let kept = h.stored_key().expect("key kept while cart is stuck");
    assert_eq!(h.gateway.keys()[0], kept.as_str());

    // Storage recovers; the same cart goes out under the same key.
    *h.gateway.break_on_call.lock().unwrap() = None;
    fail_writes.store(false, Ordering::SeqCst);
    h.flow.submit(&mut h.cart, None).await.unwrap();

    let keys = h.gateway.keys();
    assert_eq!(keys[0], keys[1]);
    assert!(h.cart.is_empty());
    assert!(!h.record_exists());
}

#[tokio::test]
async fn expired_key_is_replaced() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.fail(server_error());
    h.gateway.fail(server_error());

    h.flow.submit(&mut h.cart, None).await.unwrap_err();
    h.clock.advance(Duration::hours(24));
    assert!(h.stored_key().is_none());
    h.flow.submit(&mut h.cart, None).await.unwrap_err();

    let keys = h.gateway.keys();
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn key_just_inside_window_is_reused() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.fail(server_error());
    h.gateway.succeed();

    h.flow.submit(&mut h.cart, None).await.unwrap_err();
    h.clock
        .advance(Duration::hours(24) - Duration::milliseconds(1));
    h.flow.submit(&mut h.cart, None).await.unwrap();

    let keys = h.gateway.keys();
    assert_eq!(keys[0], keys[1]);
}

#[tokio::test]
async fn states_are_published_in_order() {
    let mut h = Harness::new();
    h.fill_cart();
    h.gateway.succeed();
    *h.gateway.watcher.lock().unwrap() = Some(h.flow.subscribe());
    let mut rx = h.flow.subscribe();
    assert_eq!(*rx.borrow_and_update(), CheckoutState::Idle);

    h.flow.submit(&mut h.cart, None).await.unwrap();

    assert_eq!(
        *h.gateway.seen_states.lock().unwrap(),
        vec![CheckoutState::Submitting]
    );
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), CheckoutState::Success);

    // A finished checkout can start another one.
    h.fill_cart();
    h.gateway.fail(server_error());
    h.flow.submit(&mut h.cart, None).await.unwrap_err();
    assert_eq!(
        *h.gateway.seen_states.lock().unwrap(),
        vec![CheckoutState::Submitting, CheckoutState::Submitting]
    );
    assert_eq!(*rx.borrow_and_update(), CheckoutState::Idle);

    h.flow.reset();
    assert!(h.flow.last_error().is_none());
}

#[tokio::test]
async fn custom_order_context_is_isolated() {
    let cache = Cache::in_memory();
    let gateway = Arc::new(MockGateway::default());
    gateway.fail(server_error());

    let mut flow = CheckoutFlow::new(gateway.clone(), IdempotencyKeys::new(cache.clone()))
        .with_order_context("donation-drive");
    let mut cart = CartStore::open(cache.clone()).unwrap();
    cart.add_item(CartItem::new(ItemId::new(4), "Soap", Money::from_cents(300)), 1)
        .unwrap();

    flow.submit(&mut cart, None).await.unwrap_err();

    assert!(cache.exists("idempotency-donation-drive").unwrap());
    assert!(!cache.exists("idempotency-last-order").unwrap());
}

#[tokio::test]
async fn http_checkout_over_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let cache = Cache::new(FileStore::open(&path).unwrap());

    let transport = Arc::new(ScriptedTransport::new());
    transport.push_response(Response::json_body(
        503,
        &serde_json::json!({ "error": "Service unavailable" }),
    ));
    transport.push_response(Response::json_body(
        201,
        &serde_json::json!({
            "id": 55,
            "user_id": 3,
            "total_amount": "20.00",
            "status": "pending",
            "shipping_address": null,
            "items": [{
                "id": 1,
                "order_id": 55,
                "inventory_item_id": 9,
                "quantity": 2,
                "price_at_purchase": "10.00",
            }],
            "created_at": "2024-03-10T09:00:00.000001",
            "jobs": { "receipt": "r-1", "inventory_sync": "s-1" },
        }),
    ));
    let api = ApiClient::new(
        FetchClient::with_transport(transport.clone()).with_base_url("http://localhost:5000/api"),
    )
    .with_bearer_token("secret");

    let mut cart = CartStore::open(cache.clone()).unwrap();
    cart.add_item(CartItem::new(ItemId::new(9), "Blanket", Money::from_cents(1000)), 2)
        .unwrap();
    let mut flow = CheckoutFlow::new(Arc::new(api), IdempotencyKeys::new(cache.clone()));

    let err = flow.submit(&mut cart, None).await.unwrap_err();
    assert_eq!(err.user_message(GENERIC_CHECKOUT_FAILURE), "Service unavailable");

    // Simulate a restart: everything reloads from disk.
    let cache = Cache::new(FileStore::open(&path).unwrap());
    let mut cart = CartStore::open(cache.clone()).unwrap();
    assert_eq!(cart.item_count(), 2);
    let api = ApiClient::new(
        FetchClient::with_transport(transport.clone()).with_base_url("http://localhost:5000/api"),
    );
    let mut flow = CheckoutFlow::new(Arc::new(api), IdempotencyKeys::new(cache.clone()));

    let placed = flow.submit(&mut cart, None).await.unwrap();
    assert_eq!(placed.total_amount, Money::from_cents(2000));
    assert_eq!(placed.items[0].quantity, 2);

    let sent = transport.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].url, "http://localhost:5000/api/orders");
    assert_eq!(sent[0].header("Authorization"), Some("Bearer secret"));
    assert_eq!(sent[1].header("Authorization"), None);
    assert_eq!(
        sent[0].header("Idempotency-Key"),
        sent[1].header("Idempotency-Key")
    );

    let raw: serde_json::Value = cache.get(CART_STORAGE_KEY).unwrap().unwrap();
    assert_eq!(raw["state"]["items"], serde_json::json!([]));
    assert!(!cache.exists("idempotency-last-order").unwrap());
}
