use std::path::Path;
use std::sync::Arc;

use anyhow::{ anyhow, Result };
use async_trait::async_trait;
use common::storage::DurableStorage;
use rocksdb::{ ColumnFamilyDescriptor, Options, DB };
use tokio::sync::Mutex;
use tracing::debug;

const LOCAL_STORAGE_CF: &str = "local_storage";

/// Session storage in a RocksDB column family, values kept as UTF-8 JSON.
pub struct RocksDbStorage {
	db: Arc<Mutex<DB>>,
}

impl RocksDbStorage {
	pub fn open(data_dir: &str) -> Result<Self> {
		// Create data directory if it doesn't exist
		let dir = Path::new(data_dir);
		if !dir.exists() {
			std::fs::create_dir_all(dir)?;
		}
		let db_path = dir.join("harvesthub-rocksdb");

		let mut opts = Options::default();
		opts.create_if_missing(true);
		opts.create_missing_column_families(true);
		opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

		let mut cf_opts = Options::default();
		cf_opts.set_max_write_buffer_number(2);
		let cf = ColumnFamilyDescriptor::new(LOCAL_STORAGE_CF, cf_opts);

		let db = DB::open_cf_descriptors(&opts, &db_path, vec![cf])?;
		debug!("Opened RocksDB storage at {}", db_path.display());

		Ok(Self { db: Arc::new(Mutex::new(db)) })
	}
}

#[async_trait]
impl DurableStorage for RocksDbStorage {
	fn backend_name(&self) -> String {
		"RocksDB".to_string()
	}

	async fn get(&self, key: &str) -> Result<Option<String>> {
		let db = self.db.lock().await;
		let cf = db
			.cf_handle(LOCAL_STORAGE_CF)
			.ok_or_else(|| anyhow!("missing column family {}", LOCAL_STORAGE_CF))?;
		match db.get_cf(&cf, key.as_bytes())? {
			Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
			None => Ok(None),
		}
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		let db = self.db.lock().await;
		let cf = db
			.cf_handle(LOCAL_STORAGE_CF)
			.ok_or_else(|| anyhow!("missing column family {}", LOCAL_STORAGE_CF))?;
		db.put_cf(&cf, key.as_bytes(), value.as_bytes())?;
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		let db = self.db.lock().await;
		let cf = db
			.cf_handle(LOCAL_STORAGE_CF)
			.ok_or_else(|| anyhow!("missing column family {}", LOCAL_STORAGE_CF))?;
		db.delete_cf(&cf, key.as_bytes())?;
		Ok(())
	}
}
