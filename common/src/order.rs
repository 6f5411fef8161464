use std::fmt;

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

/// Order lifecycle. Forward moves follow the declaration order one step at
/// a time; `Cancelled` is only reachable before shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	Pending,
	Confirmed,
	Shipped,
	Delivered,
	Cancelled,
}

impl OrderStatus {
	pub fn progress(self) -> u8 {
		match self {
			OrderStatus::Pending => 25,
			OrderStatus::Confirmed => 50,
			OrderStatus::Shipped => 75,
			OrderStatus::Delivered => 100,
			OrderStatus::Cancelled => 0,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}

	pub fn can_transition_to(self, next: OrderStatus) -> bool {
		matches!(
			(self, next),
			(OrderStatus::Pending, OrderStatus::Confirmed) |
				(OrderStatus::Confirmed, OrderStatus::Shipped) |
				(OrderStatus::Shipped, OrderStatus::Delivered) |
				(OrderStatus::Pending, OrderStatus::Cancelled) |
				(OrderStatus::Confirmed, OrderStatus::Cancelled)
		)
	}

	/// Next forward step, if any.
	pub fn next(self) -> Option<OrderStatus> {
		match self {
			OrderStatus::Pending => Some(OrderStatus::Confirmed),
			OrderStatus::Confirmed => Some(OrderStatus::Shipped),
			OrderStatus::Shipped => Some(OrderStatus::Delivered),
			OrderStatus::Delivered | OrderStatus::Cancelled => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Shipped => "shipped",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
	Pending,
	Completed,
	Failed,
}

/// Tracking-page tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderGroup {
	Active,
	Completed,
	Cancelled,
}

impl OrderGroup {
	pub fn contains(self, status: OrderStatus) -> bool {
		match self {
			OrderGroup::Active => matches!(status, OrderStatus::Confirmed | OrderStatus::Shipped),
			OrderGroup::Completed => status == OrderStatus::Delivered,
			OrderGroup::Cancelled => status == OrderStatus::Cancelled,
		}
	}
}

/// One purchased line. `price` is the unit price at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
	pub product_id: String,
	pub quantity: u32,
	pub price: f64,
}

/// Requested line when placing an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
	pub product_id: String,
	pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
	pub status: OrderStatus,
	pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingStep {
	pub name: &'static str,
	pub completed: bool,
	pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	pub id: String,
	pub buyer_id: String,
	pub seller_id: String,
	pub products: Vec<OrderLine>,
	pub shipping: f64,
	pub total_amount: f64,
	pub status: OrderStatus,
	pub payment_status: PaymentStatus,
	pub shipping_address: String,
	pub order_date: DateTime<Utc>,
	pub expected_delivery: DateTime<Utc>,
	pub delivery_date: Option<DateTime<Utc>>,
	pub progress: u8,
	pub tracking_id: String,
	pub step_history: Vec<StatusChange>,
}

const STEP_NAMES: [(&str, OrderStatus); 4] = [
	("Order Placed", OrderStatus::Pending),
	("Confirmed", OrderStatus::Confirmed),
	("Shipped", OrderStatus::Shipped),
	("Delivered", OrderStatus::Delivered),
];

impl Order {
	pub fn subtotal(&self) -> f64 {
		self.products
			.iter()
			.map(|line| line.price * (line.quantity as f64))
			.sum()
	}

	/// Apply one lifecycle transition, keeping progress and history in step.
	/// Returns false when the move is not allowed; the order is untouched then.
	pub fn transition(&mut self, next: OrderStatus, at: DateTime<Utc>) -> bool {
		if !self.status.can_transition_to(next) {
			return false;
		}
		self.status = next;
		self.progress = next.progress();
		if next == OrderStatus::Delivered {
			self.delivery_date = Some(at);
		}
		self.step_history.push(StatusChange { status: next, at });
		true
	}

	/// Display steps for the tracking page, derived from the status alone.
	pub fn tracking_steps(&self) -> Vec<TrackingStep> {
		let reached = match self.status {
			OrderStatus::Pending => 0,
			OrderStatus::Confirmed => 1,
			OrderStatus::Shipped => 2,
			OrderStatus::Delivered => 3,
			OrderStatus::Cancelled => {
				// Only steps actually passed before cancelling count.
				let last = self.step_history
					.iter()
					.rev()
					.find(|change| change.status != OrderStatus::Cancelled)
					.map(|change| change.status)
					.unwrap_or(OrderStatus::Pending);
				return STEP_NAMES.iter()
					.map(|&(name, status)| TrackingStep {
						name,
						completed: step_index(status) <= step_index(last),
						current: false,
					})
					.collect();
			}
		};

		STEP_NAMES.iter()
			.enumerate()
			.map(|(i, &(name, _))| TrackingStep {
				name,
				completed: i < reached || (i == reached && self.status == OrderStatus::Delivered),
				current: i == reached && self.status != OrderStatus::Delivered,
			})
			.collect()
	}
}

fn step_index(status: OrderStatus) -> usize {
	STEP_NAMES.iter()
		.position(|(_, s)| *s == status)
		.unwrap_or(0)
}
