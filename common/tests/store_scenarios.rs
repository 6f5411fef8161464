use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ anyhow, Result };
use async_trait::async_trait;
use chrono::NaiveDate;
use common::config::{ LatencyProfile, Operation, StoreConfig };
use common::models::{ Credentials, NewProduct, PaymentMethod, ProductPatch, ProductQuery, Role };
use common::order::{ LineRequest, OrderStatus, PaymentStatus };
use common::payment::{ AlwaysDecline, DeclineEvery };
use common::session::{ SessionStore, CART_KEY };
use common::storage::{ DurableStorage, MemoryStorage };
use common::store::{ MockStore, OrderFilter };
use common::StoreError;

async fn fresh_store() -> MockStore {
	MockStore::in_memory(StoreConfig::fast()).await.unwrap()
}

async fn login(store: &MockStore, role: &str) {
	store
		.login(Credentials { email: String::new(), role: role.to_string() }).await
		.unwrap();
}

fn listing(title: &str, price: f64, stock: u32) -> NewProduct {
	NewProduct {
		title: title.to_string(),
		description: "Fresh from the farm".to_string(),
		price,
		stock,
		unit: "kg".to_string(),
		images: Vec::new(),
		category: "Grains".to_string(),
		category_id: "1".to_string(),
		harvest_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
		location: "Punjab, India".to_string(),
		agmark_grade: None,
		organic_certified: None,
	}
}

#[tokio::test]
async fn repeated_add_merges_into_single_line() {
	let store = fresh_store().await;

	store.add_to_cart("2", 1).await.unwrap();
	let cart = store.add_to_cart("2", 2).await.unwrap();

	assert_eq!(cart.items.len(), 1);
	assert_eq!(cart.items[0].quantity, 3);
	let totals = store.cart_totals().await;
	assert_eq!(totals.count, 3);
	assert_eq!(totals.subtotal, 135.0);
}

#[tokio::test]
async fn order_from_empty_cart_is_rejected() {
	let store = fresh_store().await;
	login(&store, "buyer").await;
	let before = store.list_orders(OrderFilter::default()).await.len();

	let err = store.create_order(Vec::new(), "Delhi").await.unwrap_err();
	assert!(matches!(err, StoreError::EmptyCart));

	let err = store.checkout("Delhi", PaymentMethod::Card).await.unwrap_err();
	assert!(matches!(err, StoreError::EmptyCart));

	assert!(store.get_cart().await.is_empty());
	assert_eq!(store.list_orders(OrderFilter::default()).await.len(), before);
}

#[tokio::test]
async fn seed_products_cannot_be_deleted() {
	let store = fresh_store().await;
	login(&store, "farmer").await;

	let err = store.delete_product("1").await.unwrap_err();
	assert!(matches!(err, StoreError::Permission(_)));

	let page = store.list_products(ProductQuery::default()).await.unwrap();
	assert_eq!(page.total, 6);
	assert!(store.get_product("1").await.is_ok());
}

#[tokio::test]
async fn search_finds_only_wheat() {
	let store = fresh_store().await;
	let page = store
		.list_products(ProductQuery { search: Some("wheat".to_string()), ..Default::default() }).await
		.unwrap();

	assert_eq!(page.total, 1);
	assert_eq!(page.products[0].title, "Premium Wheat");
}

#[tokio::test]
async fn concurrent_adds_both_land() {
	let store = fresh_store().await;

	let (first, second) = tokio::join!(store.add_to_cart("1", 1), store.add_to_cart("2", 1));
	first.unwrap();
	second.unwrap();

	let cart = store.get_cart().await;
	assert_eq!(cart.items.len(), 2);
	assert!(cart.items.iter().all(|item| item.quantity == 1));
}

#[tokio::test]
async fn update_cart_item_is_idempotent() {
	let store = fresh_store().await;
	store.add_to_cart("1", 1).await.unwrap();

	let once = store.update_cart_item("1", 7).await.unwrap();
	let twice = store.update_cart_item("1", 7).await.unwrap();
	assert_eq!(once, twice);

	let untouched = store.update_cart_item("6", 3).await.unwrap();
	assert_eq!(untouched, twice);

	let emptied = store.update_cart_item("1", 0).await.unwrap();
	assert!(emptied.is_empty());
}

#[tokio::test]
async fn order_captures_prices_and_clears_cart() {
	let store = fresh_store().await;
	login(&store, "farmer").await;
	let product = store.create_product(listing("Golden Barley", 40.0, 100)).await.unwrap();
	assert_eq!(product.agmark_grade.to_string(), "A+");
	assert!(product.organic_certified);

	store.add_to_cart(&product.id, 10).await.unwrap();
	let order = store
		.create_order(
			vec![LineRequest { product_id: product.id.clone(), quantity: 10 }],
			"Ludhiana"
		).await
		.unwrap();

	assert_eq!(order.status, OrderStatus::Pending);
	assert_eq!(order.progress, 25);
	assert_eq!(order.payment_status, PaymentStatus::Completed);
	assert_eq!(order.total_amount, 400.0 + store.config().shipping_fee);
	assert!(store.get_cart().await.is_empty());
	assert_eq!(store.get_product(&product.id).await.unwrap().stock, 90);

	store
		.update_product(&product.id, ProductPatch { price: Some(80.0), ..Default::default() }).await
		.unwrap();
	let stored = store
		.list_orders(OrderFilter { seller_id: Some("1".to_string()), ..Default::default() }).await
		.into_iter()
		.find(|o| o.id == order.id)
		.unwrap();
	assert_eq!(stored.products[0].price, 40.0);
	assert_eq!(stored.total_amount, order.total_amount);
}

#[tokio::test]
async fn failed_order_leaves_cart_and_stock_alone() {
	let store = fresh_store().await;
	login(&store, "buyer").await;
	store.add_to_cart("4", 300).await.unwrap();
	let cart_before = store.get_cart().await;

	let err = store
		.create_order(
			vec![
				LineRequest { product_id: "4".to_string(), quantity: 300 },
				LineRequest { product_id: "4".to_string(), quantity: 300 }
			],
			"Bengaluru"
		).await
		.unwrap_err();
	assert!(matches!(err, StoreError::InsufficientStock { .. }));

	let err = store
		.create_order(vec![LineRequest { product_id: "missing".to_string(), quantity: 1 }], "Bengaluru").await
		.unwrap_err();
	assert!(matches!(err, StoreError::NotFound { .. }));

	assert_eq!(store.get_cart().await, cart_before);
	assert_eq!(store.get_product("4").await.unwrap().stock, 500);
}

#[tokio::test]
async fn lifecycle_only_moves_forward() {
	let store = fresh_store().await;
	login(&store, "farmer").await;

	// ORD-002 is confirmed and sold by the demo farmer.
	let err = store.update_order_status("ORD-002", OrderStatus::Delivered).await.unwrap_err();
	assert!(matches!(err, StoreError::InvalidTransition { from: OrderStatus::Confirmed, .. }));

	let shipped = store.update_order_status("ORD-002", OrderStatus::Shipped).await.unwrap();
	assert_eq!(shipped.progress, 75);

	let err = store.update_order_status("ORD-002", OrderStatus::Cancelled).await.unwrap_err();
	assert!(matches!(err, StoreError::InvalidTransition { .. }));

	let delivered = store.update_order_status("ORD-002", OrderStatus::Delivered).await.unwrap();
	assert!(delivered.delivery_date.is_some());
	assert_eq!(delivered.progress, 100);

	let err = store.update_order_status("ORD-404", OrderStatus::Shipped).await.unwrap_err();
	assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn declined_payment_blocks_checkout() {
	let policy = Arc::new(AlwaysDecline { reason: "insufficient funds".to_string() });
	let store = MockStore::open(StoreConfig::fast(), Arc::new(MemoryStorage::new()), policy).await.unwrap();
	login(&store, "buyer").await;
	store.add_to_cart("1", 2).await.unwrap();

	let err = store.checkout("Delhi", PaymentMethod::Razorpay).await.unwrap_err();
	assert!(matches!(err, StoreError::PaymentDeclined(_)));
	assert_eq!(store.get_cart().await.items.len(), 1);
	assert_eq!(store.get_product("1").await.unwrap().stock, 5000);
}

#[tokio::test]
async fn injected_failures_are_intermittent() {
	let policy = Arc::new(DeclineEvery::new(2));
	let store = MockStore::open(StoreConfig::fast(), Arc::new(MemoryStorage::new()), policy).await.unwrap();

	assert!(store.process_payment(100, PaymentMethod::Upi).await.is_ok());
	assert!(matches!(
		store.process_payment(100, PaymentMethod::Upi).await,
		Err(StoreError::PaymentDeclined(_))
	));
	assert!(store.process_payment(100, PaymentMethod::Upi).await.is_ok());
}

#[tokio::test]
async fn checkout_charges_subtotal_plus_shipping() {
	let store = fresh_store().await;
	login(&store, "buyer").await;
	store.add_to_cart("1", 1).await.unwrap();
	store.add_to_cart("6", 2).await.unwrap();

	let order = store.checkout("Delhi", PaymentMethod::Upi).await.unwrap();
	assert_eq!(order.total_amount, 120.0 + 70.0 + 50.0);
	assert_eq!(order.buyer_id, "2");
	assert_eq!(order.seller_id, "1");
	assert!(store.get_cart().await.is_empty());
}

#[tokio::test]
async fn session_survives_reopen() {
	let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
	let payments = Arc::new(common::payment::AlwaysApprove);

	let store = MockStore::open(StoreConfig::fast(), storage.clone(), payments.clone()).await.unwrap();
	login(&store, "farmer").await;
	let product = store.create_product(listing("Millet", 30.0, 50)).await.unwrap();
	store.add_to_cart("3", 4).await.unwrap();
	drop(store);

	let reopened = MockStore::open(StoreConfig::fast(), storage.clone(), payments).await.unwrap();
	let user = reopened.current_user().await.unwrap();
	assert_eq!(user.role, Role::Farmer);
	assert_eq!(reopened.get_cart().await.line("3").map(|l| l.quantity), Some(4));
	assert_eq!(reopened.get_product(&product.id).await.unwrap().title, "Millet");

	reopened.logout().await;
	let sessions = SessionStore::new(storage.clone());
	assert!(sessions.load_user().await.unwrap().is_none());
	assert!(storage.get(CART_KEY).await.unwrap().is_none());
	assert!(reopened.get_cart().await.is_empty());
}

#[tokio::test]
async fn corrupt_session_is_treated_as_logged_out() {
	let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
	storage.set("demo_user", "not json".to_string()).await.unwrap();
	storage.set(CART_KEY, "[{}]".to_string()).await.unwrap();

	let store = MockStore::open(StoreConfig::fast(), storage, Arc::new(common::payment::AlwaysApprove)).await.unwrap();
	assert!(store.current_user().await.is_none());
	assert!(store.get_cart().await.is_empty());
	assert!(matches!(store.get_profile().await, Err(StoreError::Auth(_))));
}

#[tokio::test]
async fn only_authors_edit_their_listings() {
	let store = fresh_store().await;
	login(&store, "farmer").await;
	let product = store.create_product(listing("Sorghum", 22.0, 10)).await.unwrap();

	login(&store, "admin").await;
	let err = store.delete_product(&product.id).await.unwrap_err();
	assert!(matches!(err, StoreError::Permission(_)));
	let err = store
		.update_product("1", ProductPatch { stock: Some(1), ..Default::default() }).await
		.unwrap_err();
	assert!(matches!(err, StoreError::Permission(_)));

	login(&store, "farmer").await;
	store.delete_product(&product.id).await.unwrap();
	assert!(matches!(store.get_product(&product.id).await, Err(StoreError::NotFound { .. })));
	assert!(matches!(store.delete_product(&product.id).await, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn register_and_complete_profile() {
	let store = fresh_store().await;
	let session = store
		.register(common::models::Registration {
			name: "Anita Desai".to_string(),
			email: "anita@example.com".to_string(),
			role: Role::Buyer,
			location: None,
			phone: None,
			farm_size: None,
			experience: None,
			company: None,
		}).await
		.unwrap();
	assert!(session.token.starts_with("mock_token_"));

	let user = store
		.complete_profile(common::models::ProfileUpdate {
			company: Some("Green Grocers".to_string()),
			..Default::default()
		}).await
		.unwrap();
	assert_eq!(user.id, session.user.id);
	assert!(user.profile_completed);
	assert_eq!(store.get_profile().await.unwrap().company.as_deref(), Some("Green Grocers"));
}

/// Memory storage whose cart writes can be made slow or failing.
#[derive(Default)]
struct FlakyCartStorage {
	inner: MemoryStorage,
	slow: AtomicBool,
	failing: AtomicBool,
}

#[async_trait]
impl DurableStorage for FlakyCartStorage {
	fn backend_name(&self) -> String {
		"flaky memory".to_string()
	}

	async fn get(&self, key: &str) -> Result<Option<String>> {
		self.inner.get(key).await
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		if key == CART_KEY && self.failing.load(Ordering::SeqCst) {
			return Err(anyhow!("disk full"));
		}
		self.inner.set(key, value).await?;
		if key == CART_KEY && self.slow.load(Ordering::SeqCst) {
			tokio::time::sleep(Duration::from_millis(200)).await;
		}
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		self.inner.remove(key).await
	}
}

async fn farmer_with_full_cart(storage: Arc<FlakyCartStorage>) -> (MockStore, String) {
	let store = MockStore::open(StoreConfig::fast(), storage, Arc::new(common::payment::AlwaysApprove)).await.unwrap();
	login(&store, "farmer").await;
	let product = store.create_product(listing("Ragi", 40.0, 10)).await.unwrap();
	store.add_to_cart(&product.id, 10).await.unwrap();
	(store, product.id)
}

#[tokio::test]
async fn abandoned_order_still_commits_as_a_unit() {
	let storage = Arc::new(FlakyCartStorage::default());
	let (store, product_id) = farmer_with_full_cart(storage.clone()).await;
	storage.slow.store(true, Ordering::SeqCst);

	let lines = vec![LineRequest { product_id: product_id.clone(), quantity: 10 }];
	let attempt = tokio::time::timeout(Duration::from_millis(50), store.create_order(lines, "Ludhiana")).await;
	assert!(attempt.is_err());

	// The next read waits for the in-flight commit to finish.
	assert!(store.get_cart().await.is_empty());
	assert_eq!(store.get_product(&product_id).await.unwrap().stock, 0);
	assert_eq!(store.list_orders(OrderFilter::default()).await.len(), 4);

	storage.slow.store(false, Ordering::SeqCst);
	let reopened = MockStore::open(StoreConfig::fast(), storage, Arc::new(common::payment::AlwaysApprove)).await.unwrap();
	assert!(reopened.get_cart().await.is_empty());
	assert_eq!(reopened.get_product(&product_id).await.unwrap().stock, 0);
}

#[tokio::test]
async fn failed_cart_write_rolls_back_stock() {
	let storage = Arc::new(FlakyCartStorage::default());
	let (store, product_id) = farmer_with_full_cart(storage.clone()).await;
	storage.failing.store(true, Ordering::SeqCst);

	let lines = vec![LineRequest { product_id: product_id.clone(), quantity: 10 }];
	let err = store.create_order(lines, "Ludhiana").await.unwrap_err();
	assert!(matches!(err, StoreError::Backend(_)));

	assert_eq!(store.get_cart().await.items.len(), 1);
	assert_eq!(store.get_product(&product_id).await.unwrap().stock, 10);
	assert_eq!(store.list_orders(OrderFilter::default()).await.len(), 3);

	storage.failing.store(false, Ordering::SeqCst);
	let reopened = MockStore::open(StoreConfig::fast(), storage, Arc::new(common::payment::AlwaysApprove)).await.unwrap();
	assert_eq!(reopened.get_product(&product_id).await.unwrap().stock, 10);
	assert_eq!(reopened.get_cart().await.line(&product_id).map(|l| l.quantity), Some(10));
}

#[tokio::test]
async fn price_change_during_payment_refuses_order() {
	let mut config = StoreConfig::fast();
	config.latency = LatencyProfile::uniform(Duration::from_millis(1)).with(
		Operation::Payment,
		Duration::from_millis(200)
	);
	let store = MockStore::in_memory(config).await.unwrap();
	login(&store, "farmer").await;
	let product = store.create_product(listing("Bajra", 40.0, 10)).await.unwrap();
	store.add_to_cart(&product.id, 1).await.unwrap();

	let reprice = async {
		tokio::time::sleep(Duration::from_millis(50)).await;
		store.update_product(&product.id, ProductPatch { price: Some(400.0), ..Default::default() }).await
	};
	let (checkout, repriced) = tokio::join!(store.checkout("Jaipur", PaymentMethod::Upi), reprice);
	repriced.unwrap();

	assert!(matches!(checkout, Err(StoreError::Validation(_))));
	assert_eq!(store.list_orders(OrderFilter::default()).await.len(), 3);
	assert_eq!(store.get_product(&product.id).await.unwrap().stock, 10);
	assert_eq!(store.cart_totals().await.subtotal, 400.0);
}

#[tokio::test]
async fn checkout_total_matches_charge() {
	let store = fresh_store().await;
	login(&store, "buyer").await;
	store.add_to_cart("2", 3).await.unwrap();

	let charged = common::cart::to_minor_units(store.cart_totals().await.total_with_shipping(store.config().shipping_fee));
	let order = store.checkout("Delhi", PaymentMethod::Card).await.unwrap();
	assert_eq!(common::cart::to_minor_units(order.total_amount), charged);
}

#[tokio::test]
async fn huge_listings_do_not_overflow_cart() {
	let store = fresh_store().await;
	login(&store, "farmer").await;
	let a = store.create_product(listing("Silo A", 1.0, u32::MAX)).await.unwrap();
	let b = store.create_product(listing("Silo B", 1.0, u32::MAX)).await.unwrap();

	store.add_to_cart(&a.id, u32::MAX).await.unwrap();
	store.add_to_cart(&b.id, 1).await.unwrap();
	let err = store.add_to_cart(&a.id, 1).await.unwrap_err();
	assert!(matches!(err, StoreError::InsufficientStock { requested: u32::MAX, .. }));

	assert_eq!(store.cart_totals().await.count, u64::from(u32::MAX) + 1);
}
