use std::sync::Arc;

use anyhow::Result;
mod rocksdb_storage;

use crate::rocksdb_storage::RocksDbStorage;
use common::config::{ self, StoreConfig };
use common::demo::run_demo;

#[tokio::main]
async fn main() -> Result<()> {
	dotenvy::dotenv().ok();

	println!("Starting HarvestHub on RocksDB storage");
	let storage = RocksDbStorage::open(&config::data_dir())?;

	run_demo(Arc::new(storage), StoreConfig::from_env()).await?;

	Ok(())
}
