use thiserror::Error;

use crate::order::OrderStatus;

/// Business-rule failures returned by the store. Callers branch on the
/// variant, never on the message.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("{entity} not found: {id}")]
	NotFound {
		entity: &'static str,
		id: String,
	},

	#[error("permission denied: {0}")]
	Permission(String),

	#[error("cannot create an order from an empty cart")]
	EmptyCart,

	#[error("authentication failed: {0}")]
	Auth(String),

	#[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
	InsufficientStock {
		product_id: String,
		requested: u32,
		available: u32,
	},

	#[error("invalid order transition from {from} to {to}")]
	InvalidTransition {
		from: OrderStatus,
		to: OrderStatus,
	},

	#[error("invalid input: {0}")]
	Validation(String),

	#[error("payment declined: {0}")]
	PaymentDeclined(String),

	#[error(transparent)]
	Backend(#[from] anyhow::Error),
}

impl StoreError {
	pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
		StoreError::NotFound { entity, id: id.into() }
	}
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Problems reading a stored blob. These are recovered where they occur
/// and never reach store callers.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("malformed payload under key '{key}': {source}")]
	Malformed {
		key: String,
		#[source]
		source: serde_json::Error,
	},
}
