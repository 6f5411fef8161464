use std::sync::Arc;

use anyhow::Result;
mod sqlite_storage;

use crate::sqlite_storage::SqliteStorage;
use common::config::{ self, StoreConfig };
use common::demo::run_demo;

#[tokio::main]
async fn main() -> Result<()> {
	dotenvy::dotenv().ok();

	println!("Starting HarvestHub on SQLite storage");
	let storage = SqliteStorage::open(&config::data_dir()).await?;

	run_demo(Arc::new(storage), StoreConfig::from_env()).await?;

	Ok(())
}
