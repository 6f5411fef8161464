use std::collections::HashMap;
use std::env;
use std::time::Duration;

use tracing::warn;

/// Store operations that carry a simulated delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	Login,
	Register,
	Logout,
	Profile,
	ListProducts,
	GetProduct,
	CreateProduct,
	UpdateProduct,
	DeleteProduct,
	ListCategories,
	GetCart,
	AddToCart,
	UpdateCart,
	RemoveFromCart,
	ClearCart,
	ListOrders,
	CreateOrder,
	UpdateOrder,
	Payment,
}

const MIN_LATENCY: Duration = Duration::from_millis(1);

/// Per-operation simulated latency. Every delay is at least one millisecond.
#[derive(Debug, Clone)]
pub struct LatencyProfile {
	fallback: Duration,
	overrides: HashMap<Operation, Duration>,
}

impl LatencyProfile {
	pub fn uniform(delay: Duration) -> Self {
		Self {
			fallback: delay.max(MIN_LATENCY),
			overrides: HashMap::new(),
		}
	}

	pub fn with(mut self, op: Operation, delay: Duration) -> Self {
		self.overrides.insert(op, delay.max(MIN_LATENCY));
		self
	}

	pub fn delay(&self, op: Operation) -> Duration {
		self.overrides.get(&op).copied().unwrap_or(self.fallback)
	}
}

impl Default for LatencyProfile {
	fn default() -> Self {
		let ms = Duration::from_millis;
		Self::uniform(ms(300))
			.with(Operation::Login, ms(800))
			.with(Operation::Register, ms(1000))
			.with(Operation::Profile, ms(400))
			.with(Operation::ListProducts, ms(600))
			.with(Operation::GetProduct, ms(400))
			.with(Operation::CreateProduct, ms(800))
			.with(Operation::UpdateProduct, ms(600))
			.with(Operation::DeleteProduct, ms(500))
			.with(Operation::AddToCart, ms(400))
			.with(Operation::ClearCart, ms(200))
			.with(Operation::ListOrders, ms(500))
			.with(Operation::CreateOrder, ms(1000))
			.with(Operation::UpdateOrder, ms(500))
			.with(Operation::Payment, ms(2000))
	}
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
	pub latency: LatencyProfile,
	/// Flat shipping fee added at checkout, in rupees.
	pub shipping_fee: f64,
	pub page_size: usize,
	pub delivery_days: i64,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			latency: LatencyProfile::default(),
			shipping_fee: 50.0,
			page_size: 50,
			delivery_days: 7,
		}
	}
}

pub const LATENCY_ENV: &str = "HARVEST_LATENCY_MS";
pub const SHIPPING_FEE_ENV: &str = "HARVEST_SHIPPING_FEE";
pub const PAGE_SIZE_ENV: &str = "HARVEST_PAGE_SIZE";
pub const DATA_DIR_ENV: &str = "HARVEST_DATA_DIR";

impl StoreConfig {
	/// Config for tests: every operation takes one millisecond.
	pub fn fast() -> Self {
		Self {
			latency: LatencyProfile::uniform(MIN_LATENCY),
			..Self::default()
		}
	}

	/// Defaults overridden by `HARVEST_*` environment variables. Values that
	/// fail to parse are logged and ignored.
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Some(ms) = parse_env::<u64>(LATENCY_ENV) {
			config.latency = LatencyProfile::uniform(Duration::from_millis(ms));
		}
		if let Some(fee) = parse_env::<f64>(SHIPPING_FEE_ENV).filter(|fee| *fee >= 0.0) {
			config.shipping_fee = fee;
		}
		if let Some(size) = parse_env::<usize>(PAGE_SIZE_ENV).filter(|size| *size > 0) {
			config.page_size = size;
		}
		config
	}
}

/// Directory backends keep their files in.
pub fn data_dir() -> String {
	env::var(DATA_DIR_ENV).unwrap_or_else(|_| "./data".to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
	let raw = env::var(key).ok()?;
	match raw.trim().parse() {
		Ok(value) => Some(value),
		Err(_) => {
			warn!("Ignoring {}={:?}: not a valid value", key, raw);
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn latency_is_never_zero() {
		let profile = LatencyProfile::uniform(Duration::ZERO).with(Operation::Payment, Duration::ZERO);
		assert_eq!(profile.delay(Operation::Login), MIN_LATENCY);
		assert_eq!(profile.delay(Operation::Payment), MIN_LATENCY);
	}

	#[test]
	fn default_profile_has_per_operation_delays() {
		let profile = LatencyProfile::default();
		assert_eq!(profile.delay(Operation::Payment), Duration::from_millis(2000));
		assert_eq!(profile.delay(Operation::Logout), Duration::from_millis(300));
	}

	#[test]
	fn defaults() {
		let config = StoreConfig::default();
		assert_eq!(config.shipping_fee, 50.0);
		assert_eq!(config.page_size, 50);
	}
}
