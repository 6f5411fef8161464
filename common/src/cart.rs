use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

use crate::models::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
	pub product_id: String,
	pub product: Product,
	pub quantity: u32,
	pub added_at: DateTime<Utc>,
}

/// Cart lines of the current session. Stored as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
	pub items: Vec<CartItem>,
}

impl Cart {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn line(&self, product_id: &str) -> Option<&CartItem> {
		self.items.iter().find(|item| item.product_id == product_id)
	}

	/// Increment an existing line or append a new one.
	pub fn add(&mut self, product: &Product, quantity: u32, at: DateTime<Utc>) {
		match self.items.iter_mut().find(|item| item.product_id == product.id) {
			Some(item) => {
				item.quantity = item.quantity.saturating_add(quantity);
			}
			None =>
				self.items.push(CartItem {
					product_id: product.id.clone(),
					product: product.clone(),
					quantity,
					added_at: at,
				}),
		}
	}

	/// Zero removes the line. Missing lines are left alone.
	pub fn set_quantity(&mut self, product_id: &str, quantity: u32) {
		if quantity == 0 {
			self.remove(product_id);
		} else if let Some(item) = self.items.iter_mut().find(|item| item.product_id == product_id) {
			item.quantity = quantity;
		}
	}

	pub fn remove(&mut self, product_id: &str) {
		self.items.retain(|item| item.product_id != product_id);
	}

	/// Replace the snapshot on lines holding `product`. Returns whether any
	/// line changed.
	pub fn refresh(&mut self, product: &Product) -> bool {
		let mut changed = false;
		for item in self.items.iter_mut().filter(|item| item.product_id == product.id) {
			if item.product != *product {
				item.product = product.clone();
				changed = true;
			}
		}
		changed
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}

	pub fn totals(&self) -> CartTotals {
		CartTotals::of(Some(self))
	}
}

/// Totals derived from a cart snapshot; never cached. Prices come from each
/// line's product snapshot, which the store refreshes on every listing edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
	pub count: u64,
	pub subtotal: f64,
}

impl CartTotals {
	pub fn of(cart: Option<&Cart>) -> Self {
		let Some(cart) = cart else {
			return Self::default();
		};
		cart.items.iter().fold(Self::default(), |acc, item| Self {
			count: acc.count + u64::from(item.quantity),
			subtotal: acc.subtotal + item.product.price * (item.quantity as f64),
		})
	}

	pub fn total_with_shipping(&self, shipping: f64) -> f64 {
		self.subtotal + shipping
	}
}

/// Rupees to paise, rounded to the nearest paisa.
pub fn to_minor_units(amount: f64) -> u64 {
	if amount <= 0.0 || !amount.is_finite() {
		return 0;
	}
	(amount * 100.0).round() as u64
}
