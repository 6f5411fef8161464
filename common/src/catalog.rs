use anyhow::Result;
use tracing::info;

use crate::error::{ StoreError, StoreResult };
use crate::models::{ Product, ProductPatch, User };
use crate::session::{ read_json, write_json };
use crate::storage::DurableStorage;

pub const AUTHORED_PRODUCTS_KEY: &str = "farmerProducts";

/// Where a product lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
	/// Built-in catalog; listing fields are read-only.
	Seed,
	/// Listed by a user; editable by its author and persisted.
	Authored,
}

/// One query surface over the seed catalog and user-authored listings.
/// Seed entries come first, authored entries follow in creation order.
#[derive(Debug, Clone)]
pub struct Catalog {
	seed: Vec<Product>,
	authored: Vec<Product>,
}

impl Catalog {
	pub fn new(seed: Vec<Product>, authored: Vec<Product>) -> Self {
		Self { seed, authored }
	}

	/// Build the catalog from seed data plus whatever authored listings are
	/// in durable storage.
	pub async fn load(seed: Vec<Product>, storage: &dyn DurableStorage) -> Result<Self> {
		let authored: Vec<Product> = read_json(storage, AUTHORED_PRODUCTS_KEY).await?.unwrap_or_default();
		if !authored.is_empty() {
			info!("Restored {} authored products from {}", authored.len(), storage.backend_name());
		}
		Ok(Self::new(seed, authored))
	}

	pub async fn persist(&self, storage: &dyn DurableStorage) -> Result<()> {
		write_json(storage, AUTHORED_PRODUCTS_KEY, &self.authored).await
	}

	pub fn iter(&self) -> impl Iterator<Item = &Product> {
		self.seed.iter().chain(self.authored.iter())
	}

	pub fn len(&self) -> usize {
		self.seed.len() + self.authored.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, id: &str) -> Option<(&Product, Origin)> {
		if let Some(product) = self.seed.iter().find(|p| p.id == id) {
			return Some((product, Origin::Seed));
		}
		self.authored
			.iter()
			.find(|p| p.id == id)
			.map(|product| (product, Origin::Authored))
	}

	pub fn product(&self, id: &str) -> StoreResult<&Product> {
		self.get(id)
			.map(|(product, _)| product)
			.ok_or_else(|| StoreError::not_found("product", id))
	}

	pub fn authored(&self) -> &[Product] {
		&self.authored
	}

	pub fn insert(&mut self, product: Product) {
		self.authored.push(product);
	}

	/// Locate an authored product the user may edit.
	fn editable_index(&self, id: &str, user: &User) -> StoreResult<usize> {
		match self.get(id) {
			None => Err(StoreError::not_found("product", id)),
			Some((_, Origin::Seed)) =>
				Err(StoreError::Permission(format!("product {} is part of the built-in catalog", id))),
			Some((product, Origin::Authored)) if product.seller.id != user.id =>
				Err(StoreError::Permission(format!("product {} belongs to another seller", id))),
			Some(_) =>
				self.authored
					.iter()
					.position(|p| p.id == id)
					.ok_or_else(|| StoreError::not_found("product", id)),
		}
	}

	/// Merge `patch` into a copy of the product; the catalog is not touched.
	pub fn patched(&self, id: &str, patch: ProductPatch, user: &User) -> StoreResult<Product> {
		let index = self.editable_index(id, user)?;
		let mut product = self.authored[index].clone();
		patch.apply(&mut product);
		Ok(product)
	}

	pub fn replace(&mut self, product: Product) {
		if let Some(slot) = self.authored.iter_mut().find(|p| p.id == product.id) {
			*slot = product;
		}
	}

	/// Check that `user` may delete the product, without deleting it.
	pub fn check_removable(&self, id: &str, user: &User) -> StoreResult<()> {
		self.editable_index(id, user).map(|_| ())
	}

	pub fn remove(&mut self, id: &str) -> Option<Product> {
		let index = self.authored.iter().position(|p| p.id == id)?;
		Some(self.authored.remove(index))
	}

	/// Take `quantity` units out of stock. Applies to seed entries too, since
	/// inventory moves even when the listing itself is read-only.
	pub fn take_stock(&mut self, id: &str, quantity: u32) -> StoreResult<()> {
		let product = self.seed
			.iter_mut()
			.chain(self.authored.iter_mut())
			.find(|p| p.id == id)
			.ok_or_else(|| StoreError::not_found("product", id))?;
		if product.stock < quantity {
			return Err(StoreError::InsufficientStock {
				product_id: id.to_string(),
				requested: quantity,
				available: product.stock,
			});
		}
		product.stock -= quantity;
		Ok(())
	}

	/// Put units back, e.g. when an order is cancelled. Unknown ids are ignored.
	pub fn return_stock(&mut self, id: &str, quantity: u32) {
		if let Some(product) = self.seed.iter_mut().chain(self.authored.iter_mut()).find(|p| p.id == id) {
			product.stock = product.stock.saturating_add(quantity);
		}
	}
}
