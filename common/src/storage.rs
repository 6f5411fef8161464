use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// String-keyed durable storage, the stand-in for browser local storage.
#[async_trait]
pub trait DurableStorage: Send + Sync {
	/// Backend name, used in logs
	fn backend_name(&self) -> String;

	/// Read the raw value stored under `key`
	async fn get(&self, key: &str) -> Result<Option<String>>;

	/// Overwrite the value stored under `key`
	async fn set(&self, key: &str, value: String) -> Result<()>;

	/// Remove `key`; removing a missing key is not an error
	async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage. Shared between store instances through an `Arc`
/// to simulate a page reload in tests.
#[derive(Default)]
pub struct MemoryStorage {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.entries.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.lock().await.is_empty()
	}
}

#[async_trait]
impl DurableStorage for MemoryStorage {
	fn backend_name(&self) -> String {
		"memory".to_string()
	}

	async fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.entries.lock().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		self.entries.lock().await.insert(key.to_string(), value);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		self.entries.lock().await.remove(key);
		Ok(())
	}
}
