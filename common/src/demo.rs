use std::sync::Arc;

use anyhow::Result;
use tracing::{ info, warn };

use crate::config::StoreConfig;
use crate::filter::{ self, ProductFilter, Quality, SortOrder };
use crate::models::{ Credentials, PaymentMethod, ProductQuery };
use crate::order::OrderStatus;
use crate::payment::AlwaysApprove;
use crate::storage::DurableStorage;
use crate::store::{ MockStore, OrderFilter };

// Walk a buyer checkout and its fulfilment against the given storage
pub async fn run_demo(storage: Arc<dyn DurableStorage>, config: StoreConfig) -> Result<()> {
	// Initialize tracing
	tracing_subscriber::fmt::init();

	info!("Opening store on {} storage", storage.backend_name());
	let store = MockStore::open(config, storage, Arc::new(AlwaysApprove)).await?;

	if let Some(user) = store.current_user().await {
		info!("Resuming session of {}; starting fresh", user.email);
		store.logout().await;
	}

	// Buyer browses and checks out
	let buyer = store.login(Credentials {
		email: "priya.buyer@example.com".to_string(),
		role: "buyer".to_string(),
	}).await?;
	info!("Logged in as {}", buyer.user.name);

	let page = store.list_products(ProductQuery {
		category: Some("grains".to_string()),
		..Default::default()
	}).await?;
	let mut organic = filter::apply(&page.products, &ProductFilter {
		quality: Some(Quality::Organic),
		max_price: Some(200.0),
		..Default::default()
	});
	filter::sort_products(&mut organic, SortOrder::BestGrade);
	info!("{} of {} grain listings are organic under 200", organic.len(), page.total);

	for product in organic.iter().take(2) {
		store.add_to_cart(&product.id, 5).await?;
	}
	let totals = store.cart_totals().await;
	info!("Cart holds {} units, subtotal {:.2}", totals.count, totals.subtotal);

	let order = match store.checkout("Delhi, India", PaymentMethod::Upi).await {
		Ok(order) => order,
		Err(e) => {
			warn!("Checkout failed: {}", e);
			return Ok(());
		}
	};
	info!("Order {} placed, total {:.2}", order.id, order.total_amount);
	store.logout().await;

	// Admin ships it
	store.login(Credentials {
		email: String::new(),
		role: "admin".to_string(),
	}).await?;
	let mut status = order.status;
	while let Some(next) = status.next() {
		let updated = store.update_order_status(&order.id, next).await?;
		info!("Order {} is {} ({}%)", updated.id, updated.status, updated.progress);
		status = updated.status;
	}

	let delivered = store.list_orders(OrderFilter {
		buyer_id: Some(buyer.user.id.clone()),
		..Default::default()
	}).await
		.into_iter()
		.filter(|o| o.status == OrderStatus::Delivered)
		.count();
	info!("{} delivered orders for {}", delivered, buyer.user.name);

	store.logout().await;
	Ok(())
}
