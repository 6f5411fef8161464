use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use common::storage::DurableStorage;
use rusqlite::{ params, OptionalExtension };
use tokio_rusqlite::Connection as AsyncConnection;
use tracing::debug;

/// Key/value session storage in a single SQLite table.
pub struct SqliteStorage {
	conn: AsyncConnection,
	db_path: String,
}

impl SqliteStorage {
	pub async fn open(data_dir: &str) -> Result<Self> {
		// Create data directory if it doesn't exist
		let dir = Path::new(data_dir);
		if !dir.exists() {
			std::fs::create_dir_all(dir)?;
		}
		let db_path = dir.join("harvesthub.db").to_string_lossy().into_owned();

		let conn = AsyncConnection::open(&db_path).await?;
		conn.call(|conn| {
			conn.execute("PRAGMA synchronous = NORMAL", [])?;
			let _ = conn.prepare("PRAGMA busy_timeout = 5000")?.query([])?;
			conn.execute(
				"CREATE TABLE IF NOT EXISTS local_storage (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
				[]
			)?;
			Ok(())
		}).await?;

		debug!("Opened SQLite storage at {}", db_path);
		Ok(Self { conn, db_path })
	}

	pub fn path(&self) -> &str {
		&self.db_path
	}
}

#[async_trait]
impl DurableStorage for SqliteStorage {
	fn backend_name(&self) -> String {
		"SQLite".to_string()
	}

	async fn get(&self, key: &str) -> Result<Option<String>> {
		let key = key.to_string();
		let value = self.conn
			.call(move |conn| {
				let value: Option<String> = conn
					.query_row("SELECT value FROM local_storage WHERE key = ?", [&key], |row| row.get(0))
					.optional()?;
				Ok(value)
			}).await?;
		Ok(value)
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		let key = key.to_string();
		self.conn
			.call(move |conn| {
				conn.execute(
					"INSERT INTO local_storage (key, value) VALUES (?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
					params![key, value]
				)?;
				Ok(())
			}).await?;
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<()> {
		let key = key.to_string();
		self.conn
			.call(move |conn| {
				conn.execute("DELETE FROM local_storage WHERE key = ?", [&key])?;
				Ok(())
			}).await?;
		Ok(())
	}
}
