use std::sync::atomic::{ AtomicU64, Ordering };

use rand::Rng;

use crate::models::PaymentMethod;

/// Outcome of a simulated charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDecision {
	Approve,
	Decline(String),
}

/// Decides whether a simulated payment succeeds.
pub trait PaymentPolicy: Send + Sync {
	fn decide(&self, amount_minor_units: u64, method: PaymentMethod) -> PaymentDecision;
}

/// Every charge goes through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl PaymentPolicy for AlwaysApprove {
	fn decide(&self, _amount_minor_units: u64, _method: PaymentMethod) -> PaymentDecision {
		PaymentDecision::Approve
	}
}

#[derive(Debug, Clone)]
pub struct AlwaysDecline {
	pub reason: String,
}

impl PaymentPolicy for AlwaysDecline {
	fn decide(&self, _amount_minor_units: u64, _method: PaymentMethod) -> PaymentDecision {
		PaymentDecision::Decline(self.reason.clone())
	}
}

/// Declines every n-th attempt (1-based), approves the rest.
#[derive(Debug)]
pub struct DeclineEvery {
	every: u64,
	attempts: AtomicU64,
}

impl DeclineEvery {
	pub fn new(every: u64) -> Self {
		Self {
			every: every.max(1),
			attempts: AtomicU64::new(0),
		}
	}
}

impl PaymentPolicy for DeclineEvery {
	fn decide(&self, _amount_minor_units: u64, _method: PaymentMethod) -> PaymentDecision {
		let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
		if attempt % self.every == 0 {
			PaymentDecision::Decline(format!("injected failure on attempt {}", attempt))
		} else {
			PaymentDecision::Approve
		}
	}
}

/// Declines with the given probability.
#[derive(Debug, Clone, Copy)]
pub struct RandomDecline {
	probability: f64,
}

impl RandomDecline {
	pub fn new(probability: f64) -> Self {
		Self { probability: probability.clamp(0.0, 1.0) }
	}
}

impl PaymentPolicy for RandomDecline {
	fn decide(&self, _amount_minor_units: u64, _method: PaymentMethod) -> PaymentDecision {
		let mut rng = rand::thread_rng();
		if rng.gen_bool(self.probability) {
			PaymentDecision::Decline("gateway timeout".to_string())
		} else {
			PaymentDecision::Approve
		}
	}
}
