use std::future::Future;
use std::sync::Arc;

use anyhow::{ anyhow, Result };
use chrono::{ Duration, Utc };
use serde::{ Deserialize, Serialize };
use tokio::sync::{ Mutex, OwnedMutexGuard };
use tracing::{ debug, error, info, warn };

use crate::cart::{ to_minor_units, Cart, CartTotals };
use crate::catalog::{ Catalog, Origin };
use crate::config::{ Operation, StoreConfig };
use crate::error::{ StoreError, StoreResult };
use crate::filter::{ contains_ignore_case, matches_text };
use crate::models::{
	Category,
	Credentials,
	Grade,
	NewProduct,
	Page,
	PaymentMethod,
	PaymentResult,
	Product,
	ProductPatch,
	ProductQuery,
	ProfileUpdate,
	Registration,
	Role,
	SellerRef,
	Session,
	User,
};
use crate::order::{
	LineRequest,
	Order,
	OrderGroup,
	OrderLine,
	OrderStatus,
	PaymentStatus,
	StatusChange,
};
use crate::payment::{ AlwaysApprove, PaymentDecision, PaymentPolicy };
use crate::seed;
use crate::session::SessionStore;
use crate::storage::{ DurableStorage, MemoryStorage };

/// Optional scoping for order listings. Unset fields do not filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
	pub seller_id: Option<String>,
	pub buyer_id: Option<String>,
	pub group: Option<OrderGroup>,
}

impl OrderFilter {
	fn matches(&self, order: &Order) -> bool {
		self.seller_id.as_ref().map_or(true, |id| &order.seller_id == id) &&
			self.buyer_id.as_ref().map_or(true, |id| &order.buyer_id == id) &&
			self.group.map_or(true, |group| group.contains(order.status))
	}
}

struct StoreState {
	current_user: Option<User>,
	catalog: Catalog,
	categories: Vec<Category>,
	cart: Cart,
	orders: Vec<Order>,
}

impl StoreState {
	fn user(&self) -> StoreResult<&User> {
		self.current_user.as_ref().ok_or_else(|| StoreError::Auth("no user is logged in".to_string()))
	}

	/// Write the in-memory catalog back over a newer stored copy.
	async fn restore_catalog(&self, storage: &dyn DurableStorage) {
		if let Err(e) = self.catalog.persist(storage).await {
			error!("Failed to restore stored catalog: {:?}", e);
		}
	}
}

type Locked = OwnedMutexGuard<StoreState>;

/// In-memory marketplace backend with simulated latency.
///
/// Each call sleeps for its configured delay before taking the state lock,
/// so independent calls overlap while mutations stay serialized. A call
/// either changes nothing or commits all of its changes: new state is built
/// on copies, written to durable storage, then swapped in. Once a mutation
/// holds the lock it runs on its own task, so dropping the caller cannot
/// leave storage and memory out of step.
pub struct MockStore {
	config: StoreConfig,
	sessions: Arc<SessionStore>,
	payments: Arc<dyn PaymentPolicy>,
	state: Arc<Mutex<StoreState>>,
}

impl MockStore {
	/// Open a store over `storage`, restoring any saved session, cart and
	/// authored products.
	pub async fn open(
		config: StoreConfig,
		storage: Arc<dyn DurableStorage>,
		payments: Arc<dyn PaymentPolicy>
	) -> Result<Self> {
		let sessions = SessionStore::new(storage.clone());
		let current_user = sessions.load_user().await?;
		let cart = sessions.load_cart().await?.unwrap_or_default();
		let catalog = Catalog::load(seed::seed_products(), storage.as_ref()).await?;

		if let Some(user) = &current_user {
			info!("Restored session for {} ({})", user.email, user.role);
		}

		Ok(Self {
			config,
			sessions: Arc::new(sessions),
			payments,
			state: Arc::new(
				Mutex::new(StoreState {
					current_user,
					catalog,
					categories: seed::seed_categories(),
					cart,
					orders: seed::seed_orders(),
				})
			),
		})
	}

	/// Fresh store over process-local storage that approves every payment.
	pub async fn in_memory(config: StoreConfig) -> Result<Self> {
		Self::open(config, Arc::new(MemoryStorage::new()), Arc::new(AlwaysApprove)).await
	}

	pub fn config(&self) -> &StoreConfig {
		&self.config
	}

	async fn simulate_latency(&self, op: Operation) {
		tokio::time::sleep(self.config.latency.delay(op)).await;
	}

	/// Run a mutation against the locked state on its own task. Waiting for
	/// the lock can be cancelled; the mutation itself always runs to the end.
	async fn commit<T, F, Fut>(&self, work: F) -> StoreResult<T>
		where
			T: Send + 'static,
			F: FnOnce(Locked, Arc<SessionStore>) -> Fut,
			Fut: Future<Output = StoreResult<T>> + Send + 'static
	{
		let state = self.state.clone().lock_owned().await;
		let task = tokio::spawn(work(state, self.sessions.clone()));
		task.await.map_err(|e| StoreError::Backend(anyhow!("store task failed: {}", e)))?
	}

	// Auth

	pub async fn login(&self, credentials: Credentials) -> StoreResult<Session> {
		self.simulate_latency(Operation::Login).await;
		let role: Role = credentials.role.parse()?;
		let user = seed::demo_user(role);

		self.commit(move |mut state, sessions| async move {
			sessions.save_user(&user).await?;
			state.current_user = Some(user.clone());

			info!("Logged in {} as {}", user.email, role);
			Ok(Session { user, token: seed::new_token() })
		}).await
	}

	pub async fn register(&self, registration: Registration) -> StoreResult<Session> {
		self.simulate_latency(Operation::Register).await;
		if registration.name.trim().is_empty() || registration.email.trim().is_empty() {
			return Err(StoreError::Validation("name and email are required".to_string()));
		}
		if registration.role == Role::Admin {
			return Err(StoreError::Permission("admin accounts cannot be self-registered".to_string()));
		}
		let user = User {
			id: seed::new_user_id(),
			name: registration.name,
			email: registration.email,
			role: registration.role,
			location: registration.location,
			phone: registration.phone,
			farm_size: registration.farm_size,
			experience: registration.experience,
			company: registration.company,
			profile_completed: false,
		};

		self.commit(move |mut state, sessions| async move {
			sessions.save_user(&user).await?;
			state.current_user = Some(user.clone());

			info!("Registered {} as {}", user.email, user.role);
			Ok(Session { user, token: seed::new_token() })
		}).await
	}

	/// Drops the session and cart. Storage failures are logged, never returned.
	pub async fn logout(&self) {
		self.simulate_latency(Operation::Logout).await;
		let result = self.commit(|mut state, sessions| async move {
			if let Err(e) = sessions.clear().await {
				error!("Failed to clear stored session: {:?}", e);
			}
			if let Some(user) = state.current_user.take() {
				info!("Logged out {}", user.email);
			}
			state.cart.clear();
			Ok(())
		}).await;
		if let Err(e) = result {
			error!("Logout did not complete: {:?}", e);
		}
	}

	pub async fn get_profile(&self) -> StoreResult<User> {
		self.simulate_latency(Operation::Profile).await;
		let state = self.state.lock().await;
		state.user().cloned()
	}

	pub async fn complete_profile(&self, update: ProfileUpdate) -> StoreResult<User> {
		self.simulate_latency(Operation::Profile).await;
		self.commit(move |mut state, sessions| async move {
			let mut user = state.user()?.clone();

			if let Some(name) = update.name {
				user.name = name;
			}
			user.location = update.location.or(user.location);
			user.phone = update.phone.or(user.phone);
			user.farm_size = update.farm_size.or(user.farm_size);
			user.experience = update.experience.or(user.experience);
			user.company = update.company.or(user.company);
			user.profile_completed = true;

			sessions.save_user(&user).await?;
			state.current_user = Some(user.clone());
			Ok(user)
		}).await
	}

	/// Current session user without any simulated delay.
	pub async fn current_user(&self) -> Option<User> {
		self.state.lock().await.current_user.clone()
	}

	// Products

	pub async fn list_products(&self, query: ProductQuery) -> StoreResult<Page<Product>> {
		self.simulate_latency(Operation::ListProducts).await;
		let state = self.state.lock().await;

		let owner = if query.mine { Some(state.user()?.email.clone()) } else { None };
		let matching: Vec<&Product> = state.catalog
			.iter()
			.filter(|p| query.category.as_ref().map_or(true, |c| contains_ignore_case(&p.category, c)))
			.filter(|p| query.search.as_ref().map_or(true, |s| matches_text(p, s)))
			.filter(|p| owner.as_ref().map_or(true, |email| &p.seller.email == email))
			.collect();

		let limit = query.limit.unwrap_or(self.config.page_size).max(1);
		let page = query.page.unwrap_or(1).max(1);
		let total = matching.len();
		let products = matching
			.into_iter()
			.skip((page - 1).saturating_mul(limit))
			.take(limit)
			.cloned()
			.collect();

		debug!("Listed page {} of products: {} matching", page, total);
		Ok(Page {
			products,
			total,
			page,
			total_pages: total.div_ceil(limit),
		})
	}

	pub async fn get_product(&self, id: &str) -> StoreResult<Product> {
		self.simulate_latency(Operation::GetProduct).await;
		let state = self.state.lock().await;
		state.catalog.product(id).cloned()
	}

	pub async fn create_product(&self, data: NewProduct) -> StoreResult<Product> {
		self.simulate_latency(Operation::CreateProduct).await;
		validate_listing(&data.title, data.price)?;

		self.commit(move |mut state, sessions| async move {
			let user = state.user()?;
			if user.role == Role::Buyer {
				return Err(StoreError::Permission("buyers cannot list products".to_string()));
			}

			let product = Product {
				id: seed::new_product_id(),
				title: data.title,
				description: data.description,
				price: data.price,
				stock: data.stock,
				unit: data.unit,
				images: data.images,
				category: data.category,
				category_id: data.category_id,
				seller: SellerRef::from(user),
				agmark_grade: data.agmark_grade.unwrap_or(Grade::APlus),
				harvest_date: data.harvest_date,
				location: data.location,
				organic_certified: data.organic_certified.unwrap_or(true),
				created_at: Utc::now(),
			};

			let mut catalog = state.catalog.clone();
			catalog.insert(product.clone());
			catalog.persist(sessions.storage().as_ref()).await?;
			state.catalog = catalog;

			info!("Product {} listed by {}", product.id, product.seller.email);
			Ok(product)
		}).await
	}

	/// Cart lines holding the product pick up the edited listing, so cart
	/// totals follow the current price.
	pub async fn update_product(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
		self.simulate_latency(Operation::UpdateProduct).await;
		let id = id.to_string();

		self.commit(move |mut state, sessions| async move {
			let updated = state.catalog.patched(&id, patch, state.user()?)?;
			validate_listing(&updated.title, updated.price)?;

			let mut catalog = state.catalog.clone();
			catalog.replace(updated.clone());
			let mut cart = state.cart.clone();
			let cart_changed = cart.refresh(&updated);

			let storage = sessions.storage().clone();
			catalog.persist(storage.as_ref()).await?;
			if cart_changed {
				if let Err(e) = sessions.save_cart(&cart).await {
					state.restore_catalog(storage.as_ref()).await;
					return Err(e.into());
				}
			}

			state.catalog = catalog;
			state.cart = cart;
			Ok(updated)
		}).await
	}

	pub async fn delete_product(&self, id: &str) -> StoreResult<()> {
		self.simulate_latency(Operation::DeleteProduct).await;
		let id = id.to_string();

		self.commit(move |mut state, sessions| async move {
			state.catalog.check_removable(&id, state.user()?)?;

			let mut catalog = state.catalog.clone();
			catalog.remove(&id);
			catalog.persist(sessions.storage().as_ref()).await?;
			state.catalog = catalog;

			info!("Product {} removed", id);
			Ok(())
		}).await
	}

	pub async fn list_categories(&self) -> Vec<Category> {
		self.simulate_latency(Operation::ListCategories).await;
		self.state.lock().await.categories.clone()
	}

	// Cart

	pub async fn get_cart(&self) -> Cart {
		self.simulate_latency(Operation::GetCart).await;
		self.state.lock().await.cart.clone()
	}

	/// Totals of the current cart, recomputed on every call.
	pub async fn cart_totals(&self) -> CartTotals {
		self.state.lock().await.cart.totals()
	}

	pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> StoreResult<Cart> {
		self.simulate_latency(Operation::AddToCart).await;
		if quantity == 0 {
			return Err(StoreError::Validation("quantity must be at least 1".to_string()));
		}
		let product_id = product_id.to_string();

		self.commit(move |mut state, sessions| async move {
			let product = state.catalog.product(&product_id)?;
			let in_cart = state.cart.line(&product_id).map_or(0, |item| item.quantity);
			match in_cart.checked_add(quantity) {
				Some(requested) if requested <= product.stock => {}
				requested => {
					return Err(StoreError::InsufficientStock {
						product_id,
						requested: requested.unwrap_or(u32::MAX),
						available: product.stock,
					});
				}
			}

			let mut cart = state.cart.clone();
			cart.add(product, quantity, Utc::now());
			sessions.save_cart(&cart).await?;
			state.cart = cart;
			Ok(state.cart.clone())
		}).await
	}

	/// Zero removes the line; a missing line is left alone.
	pub async fn update_cart_item(&self, product_id: &str, quantity: u32) -> StoreResult<Cart> {
		self.simulate_latency(Operation::UpdateCart).await;
		let product_id = product_id.to_string();

		self.commit(move |mut state, sessions| async move {
			if state.cart.line(&product_id).is_none() {
				return Ok(state.cart.clone());
			}
			if quantity > 0 {
				if let Some((product, _)) = state.catalog.get(&product_id) {
					if quantity > product.stock {
						return Err(StoreError::InsufficientStock {
							product_id,
							requested: quantity,
							available: product.stock,
						});
					}
				}
			}

			let mut cart = state.cart.clone();
			cart.set_quantity(&product_id, quantity);
			sessions.save_cart(&cart).await?;
			state.cart = cart;
			Ok(state.cart.clone())
		}).await
	}

	pub async fn remove_from_cart(&self, product_id: &str) -> StoreResult<Cart> {
		self.simulate_latency(Operation::RemoveFromCart).await;
		let product_id = product_id.to_string();

		self.commit(move |mut state, sessions| async move {
			let mut cart = state.cart.clone();
			cart.remove(&product_id);
			sessions.save_cart(&cart).await?;
			state.cart = cart;
			Ok(state.cart.clone())
		}).await
	}

	pub async fn clear_cart(&self) -> StoreResult<Cart> {
		self.simulate_latency(Operation::ClearCart).await;
		self.commit(|mut state, sessions| async move {
			sessions.save_cart(&Cart::new()).await?;
			state.cart.clear();
			Ok(Cart::new())
		}).await
	}

	// Orders

	pub async fn list_orders(&self, filter: OrderFilter) -> Vec<Order> {
		self.simulate_latency(Operation::ListOrders).await;
		let state = self.state.lock().await;
		state.orders
			.iter()
			.filter(|order| filter.matches(order))
			.cloned()
			.collect()
	}

	pub async fn create_order(
		&self,
		lines: Vec<LineRequest>,
		shipping_address: &str
	) -> StoreResult<Order> {
		self.place_order(lines, shipping_address, None).await
	}

	/// Turn `lines` into an order. With `quoted` set, the order is refused
	/// unless current prices still match the quote.
	async fn place_order(
		&self,
		lines: Vec<LineRequest>,
		shipping_address: &str,
		quoted: Option<Vec<OrderLine>>
	) -> StoreResult<Order> {
		self.simulate_latency(Operation::CreateOrder).await;
		if lines.is_empty() {
			return Err(StoreError::EmptyCart);
		}
		let shipping_fee = self.config.shipping_fee;
		let delivery_days = self.config.delivery_days;
		let shipping_address = shipping_address.to_string();

		self.commit(move |mut state, sessions| async move {
			let buyer_id = state.user()?.id.clone();
			let priced = price_lines(&state.catalog, &lines)?;
			if quoted.as_ref().map_or(false, |quoted| *quoted != priced) {
				return Err(
					StoreError::Validation("prices changed while the payment was processed".to_string())
				);
			}

			let mut catalog = state.catalog.clone();
			for line in &priced {
				catalog.take_stock(&line.product_id, line.quantity)?;
			}
			let seller_id = catalog.product(&priced[0].product_id)?.seller.id.clone();

			let now = Utc::now();
			let id = seed::new_order_id();
			let order = Order {
				tracking_id: format!("TRK{}", id),
				id,
				buyer_id,
				seller_id,
				shipping: shipping_fee,
				total_amount: subtotal(&priced) + shipping_fee,
				products: priced,
				status: OrderStatus::Pending,
				payment_status: PaymentStatus::Completed,
				shipping_address,
				order_date: now,
				expected_delivery: now + Duration::days(delivery_days),
				delivery_date: None,
				progress: OrderStatus::Pending.progress(),
				step_history: vec![StatusChange { status: OrderStatus::Pending, at: now }],
			};

			let touches_authored = order.products
				.iter()
				.any(|line| matches!(catalog.get(&line.product_id), Some((_, Origin::Authored))));
			let storage = sessions.storage().clone();
			if touches_authored {
				catalog.persist(storage.as_ref()).await?;
			}
			if let Err(e) = sessions.save_cart(&Cart::new()).await {
				if touches_authored {
					state.restore_catalog(storage.as_ref()).await;
				}
				return Err(e.into());
			}

			state.catalog = catalog;
			state.cart.clear();
			state.orders.push(order.clone());

			info!("Order {} placed by {} for {:.2}", order.id, order.buyer_id, order.total_amount);
			Ok(order)
		}).await
	}

	/// Move an order one step along its lifecycle. Sellers and admins may
	/// advance or cancel; buyers may only cancel their own orders.
	pub async fn update_order_status(&self, id: &str, next: OrderStatus) -> StoreResult<Order> {
		self.simulate_latency(Operation::UpdateOrder).await;
		let id = id.to_string();

		self.commit(move |mut state, sessions| async move {
			let user = state.user()?.clone();

			let index = state.orders
				.iter()
				.position(|order| order.id == id)
				.ok_or_else(|| StoreError::not_found("order", &id))?;
			let mut order = state.orders[index].clone();

			let allowed =
				user.role == Role::Admin ||
				order.seller_id == user.id ||
				(order.buyer_id == user.id && next == OrderStatus::Cancelled);
			if !allowed {
				return Err(StoreError::Permission(format!("{} cannot update order {}", user.email, id)));
			}

			let from = order.status;
			if !order.transition(next, Utc::now()) {
				return Err(StoreError::InvalidTransition { from, to: next });
			}

			if next == OrderStatus::Cancelled {
				let mut catalog = state.catalog.clone();
				let mut touches_authored = false;
				for line in &order.products {
					let origin = catalog.get(&line.product_id).map(|(_, origin)| origin);
					touches_authored |= origin == Some(Origin::Authored);
					catalog.return_stock(&line.product_id, line.quantity);
				}
				if touches_authored {
					catalog.persist(sessions.storage().as_ref()).await?;
				}
				state.catalog = catalog;
			}

			state.orders[index] = order.clone();
			info!("Order {} moved from {} to {}", order.id, from, next);
			Ok(order)
		}).await
	}

	// Payment

	pub async fn process_payment(
		&self,
		amount_minor_units: u64,
		method: PaymentMethod
	) -> StoreResult<PaymentResult> {
		self.simulate_latency(Operation::Payment).await;
		if amount_minor_units == 0 {
			return Err(StoreError::Validation("payment amount must be positive".to_string()));
		}
		match self.payments.decide(amount_minor_units, method) {
			PaymentDecision::Approve =>
				Ok(PaymentResult {
					success: true,
					transaction_id: seed::new_transaction_id(),
					payment_method: method,
					amount_minor_units,
				}),
			PaymentDecision::Decline(reason) => {
				warn!("Payment of {} via {:?} declined: {}", amount_minor_units, method, reason);
				Err(StoreError::PaymentDeclined(reason))
			}
		}
	}

	/// Pay for the current cart plus shipping, then turn it into an order at
	/// the prices that were charged. An empty cart or unavailable stock fails
	/// before any charge is made.
	pub async fn checkout(&self, shipping_address: &str, method: PaymentMethod) -> StoreResult<Order> {
		let (lines, quoted, amount) = {
			let state = self.state.lock().await;
			if state.cart.is_empty() {
				return Err(StoreError::EmptyCart);
			}
			state.user()?;
			let lines: Vec<LineRequest> = state.cart.items
				.iter()
				.map(|item| LineRequest {
					product_id: item.product_id.clone(),
					quantity: item.quantity,
				})
				.collect();
			let priced = price_lines(&state.catalog, &lines)?;
			let mut catalog = state.catalog.clone();
			for line in &priced {
				catalog.take_stock(&line.product_id, line.quantity)?;
			}
			let amount = to_minor_units(subtotal(&priced) + self.config.shipping_fee);
			(lines, priced, amount)
		};

		let payment = self.process_payment(amount, method).await?;
		match self.place_order(lines, shipping_address, Some(quoted)).await {
			Ok(order) => Ok(order),
			Err(e) => {
				warn!("Payment {} captured but order failed: {}", payment.transaction_id, e);
				Err(e)
			}
		}
	}
}

fn validate_listing(title: &str, price: f64) -> StoreResult<()> {
	if title.trim().is_empty() {
		return Err(StoreError::Validation("title is required".to_string()));
	}
	if !price.is_finite() || price < 0.0 {
		return Err(StoreError::Validation(format!("invalid price {}", price)));
	}
	Ok(())
}

/// Resolve requested lines against the catalog, capturing current prices.
fn price_lines(catalog: &Catalog, lines: &[LineRequest]) -> StoreResult<Vec<OrderLine>> {
	lines
		.iter()
		.map(|line| {
			if line.quantity == 0 {
				return Err(StoreError::Validation(format!("zero quantity for product {}", line.product_id)));
			}
			let product = catalog.product(&line.product_id)?;
			Ok(OrderLine {
				product_id: line.product_id.clone(),
				quantity: line.quantity,
				price: product.price,
			})
		})
		.collect()
}

fn subtotal(lines: &[OrderLine]) -> f64 {
	lines
		.iter()
		.map(|line| line.price * (line.quantity as f64))
		.sum()
}
