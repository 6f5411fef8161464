use std::sync::Arc;

use anyhow::Result;
use serde::{ de::DeserializeOwned, Serialize };
use tokio::sync::Mutex;
use tracing::{ debug, warn };

use crate::cart::Cart;
use crate::error::StorageError;
use crate::models::User;
use crate::storage::DurableStorage;

pub const USER_KEY: &str = "demo_user";
pub const CART_KEY: &str = "demo_cart";

/// Decode a stored blob. A payload that does not parse is reported as
/// `StorageError::Malformed` and is otherwise treated as absent.
pub(crate) async fn read_json<T: DeserializeOwned>(
	storage: &dyn DurableStorage,
	key: &str
) -> Result<Option<T>> {
	let Some(raw) = storage.get(key).await? else {
		return Ok(None);
	};
	match serde_json::from_str(&raw) {
		Ok(value) => Ok(Some(value)),
		Err(source) => {
			let err = StorageError::Malformed { key: key.to_string(), source };
			warn!("Ignoring stored value on {}: {}", storage.backend_name(), err);
			Ok(None)
		}
	}
}

pub(crate) async fn write_json<T: Serialize>(
	storage: &dyn DurableStorage,
	key: &str,
	value: &T
) -> Result<()> {
	storage.set(key, serde_json::to_string(value)?).await
}

/// Persists the current user and cart so a new store instance can pick the
/// session back up.
pub struct SessionStore {
	storage: Arc<dyn DurableStorage>,
	write_lock: Mutex<()>,
}

impl SessionStore {
	pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	pub async fn load_user(&self) -> Result<Option<User>> {
		read_json(self.storage.as_ref(), USER_KEY).await
	}

	pub async fn load_cart(&self) -> Result<Option<Cart>> {
		read_json(self.storage.as_ref(), CART_KEY).await
	}

	pub async fn save_user(&self, user: &User) -> Result<()> {
		let _guard = self.write_lock.lock().await;
		debug!("Saving session for user {}", user.id);
		write_json(self.storage.as_ref(), USER_KEY, user).await
	}

	pub async fn save_cart(&self, cart: &Cart) -> Result<()> {
		let _guard = self.write_lock.lock().await;
		write_json(self.storage.as_ref(), CART_KEY, cart).await
	}

	/// Remove both the user and the cart.
	pub async fn clear(&self) -> Result<()> {
		let _guard = self.write_lock.lock().await;
		self.storage.remove(USER_KEY).await?;
		self.storage.remove(CART_KEY).await
	}

	pub fn storage(&self) -> &Arc<dyn DurableStorage> {
		&self.storage
	}
}
