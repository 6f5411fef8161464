//! Built-in demo data: the canonical users, catalog, categories and a few
//! historical orders the store starts from.

use chrono::{ DateTime, NaiveDate, TimeZone, Utc };
use uuid::Uuid;

use crate::models::{ Category, Grade, Product, Role, SellerRef, User };
use crate::order::{ Order, OrderLine, OrderStatus, PaymentStatus, StatusChange };

/// Canonical demo user for a role.
pub fn demo_user(role: Role) -> User {
	match role {
		Role::Farmer =>
			User {
				id: "1".to_string(),
				name: "Ramesh Kumar".to_string(),
				email: "ramesh.farmer@example.com".to_string(),
				role,
				location: Some("Punjab, India".to_string()),
				phone: Some("+91 98765 43210".to_string()),
				farm_size: Some("25 acres".to_string()),
				experience: Some("15 years".to_string()),
				company: None,
				profile_completed: false,
			},
		Role::Buyer =>
			User {
				id: "2".to_string(),
				name: "Priya Sharma".to_string(),
				email: "priya.buyer@example.com".to_string(),
				role,
				location: Some("Delhi, India".to_string()),
				phone: Some("+91 87654 32109".to_string()),
				farm_size: None,
				experience: None,
				company: Some("Fresh Mart Pvt Ltd".to_string()),
				profile_completed: false,
			},
		Role::Admin =>
			User {
				id: "3".to_string(),
				name: "Admin User".to_string(),
				email: "admin@harvesthub.com".to_string(),
				role,
				location: None,
				phone: None,
				farm_size: None,
				experience: None,
				company: None,
				profile_completed: false,
			},
	}
}

pub fn seed_categories() -> Vec<Category> {
	[
		("1", "Grains", "Rice, Wheat, Barley, etc."),
		("2", "Vegetables", "Fresh vegetables and greens"),
		("3", "Fruits", "Fresh seasonal fruits"),
		("4", "Fertilizers", "Organic and chemical fertilizers"),
		("5", "Seeds", "High-quality seeds for planting"),
	]
		.into_iter()
		.map(|(id, name, description)| Category {
			id: id.to_string(),
			name: name.to_string(),
			description: description.to_string(),
		})
		.collect()
}

fn seller(id: &str, name: &str, email: &str, location: &str) -> SellerRef {
	SellerRef {
		id: id.to_string(),
		name: name.to_string(),
		email: email.to_string(),
		location: Some(location.to_string()),
	}
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap_or_default()
}

struct SeedRow {
	id: &'static str,
	title: &'static str,
	description: &'static str,
	price: f64,
	stock: u32,
	image: &'static str,
	category: (&'static str, &'static str),
	seller: SellerRef,
	grade: Grade,
	harvested: NaiveDate,
	organic: bool,
	created: DateTime<Utc>,
}

pub fn seed_products() -> Vec<Product> {
	let ramesh = seller("1", "Ramesh Kumar", "ramesh.farmer@example.com", "Punjab, India");
	let suresh = seller("2", "Suresh Patel", "suresh.farmer@example.com", "Gujarat, India");
	let vikram = seller("3", "Vikram Singh", "vikram.farmer@example.com", "Haryana, India");
	let kiran = seller("4", "Kiran Reddy", "kiran.farmer@example.com", "Karnataka, India");

	let rows = vec![
		SeedRow {
			id: "1",
			title: "Organic Basmati Rice",
			description: "Premium quality organic basmati rice, aged for 2 years. AGMARK certified Grade A+. Perfect aroma and long grains.",
			price: 120.0,
			stock: 5000,
			image: "/basmati rice.jpeg",
			category: ("1", "Grains"),
			seller: ramesh.clone(),
			grade: Grade::APlus,
			harvested: date(2025, 8, 15),
			organic: true,
			created: at(2025, 8, 20, 10, 30),
		},
		SeedRow {
			id: "2",
			title: "Fresh Red Tomatoes",
			description: "Juicy and fresh red tomatoes, perfect for cooking and salads. Grown using organic farming methods.",
			price: 45.0,
			stock: 2000,
			image: "/tomatoes.jpg",
			category: ("2", "Vegetables"),
			seller: suresh.clone(),
			grade: Grade::A,
			harvested: date(2025, 8, 25),
			organic: true,
			created: at(2025, 8, 26, 9, 15),
		},
		SeedRow {
			id: "3",
			title: "Premium Wheat",
			description: "High-quality wheat grains with excellent protein content. Perfect for flour production.",
			price: 28.0,
			stock: 8000,
			image: "/wheat.jpeg",
			category: ("1", "Grains"),
			seller: vikram,
			grade: Grade::APlus,
			harvested: date(2025, 7, 20),
			organic: false,
			created: at(2025, 7, 25, 14, 20),
		},
		SeedRow {
			id: "4",
			title: "Organic Mixed Fruits",
			description: "Fresh assorted organic fruits including apples, oranges, and bananas. Seasonal variety pack.",
			price: 150.0,
			stock: 500,
			image: "/fresh-colorful-fruits-apples-oranges-bananas.png",
			category: ("3", "Fruits"),
			seller: kiran,
			grade: Grade::APlus,
			harvested: date(2025, 8, 28),
			organic: true,
			created: at(2025, 8, 30, 11, 45),
		},
		SeedRow {
			id: "5",
			title: "Organic Fertilizer",
			description: "Natural compost and organic fertilizer made from farm waste. Eco-friendly and nutrient-rich.",
			price: 25.0,
			stock: 1500,
			image: "/organic-fertilizer-bags-compost-natural-farming.png",
			category: ("4", "Fertilizers"),
			seller: ramesh,
			grade: Grade::A,
			harvested: date(2025, 8, 10),
			organic: true,
			created: at(2025, 8, 12, 16, 30),
		},
		SeedRow {
			id: "6",
			title: "Fresh Carrots & Onions",
			description: "Crisp and fresh carrots with premium onions. Great for cooking and raw consumption.",
			price: 35.0,
			stock: 1200,
			image: "/carrots_onions.webp",
			category: ("2", "Vegetables"),
			seller: suresh,
			grade: Grade::A,
			harvested: date(2025, 8, 22),
			organic: true,
			created: at(2025, 8, 24, 13, 10),
		}
	];

	rows.into_iter()
		.map(|row| {
			let location = row.seller.location.clone().unwrap_or_default();
			Product {
				id: row.id.to_string(),
				title: row.title.to_string(),
				description: row.description.to_string(),
				price: row.price,
				stock: row.stock,
				unit: "kg".to_string(),
				images: vec![row.image.to_string()],
				category: row.category.1.to_string(),
				category_id: row.category.0.to_string(),
				seller: row.seller,
				agmark_grade: row.grade,
				harvest_date: row.harvested,
				location,
				organic_certified: row.organic,
				created_at: row.created,
			}
		})
		.collect()
}

fn seed_order(
	seq: u32,
	buyer_id: &str,
	line: OrderLine,
	status: OrderStatus,
	address: &str,
	placed: DateTime<Utc>,
	expected: DateTime<Utc>,
	delivered: Option<DateTime<Utc>>
) -> Order {
	let id = format!("ORD-{:03}", seq);
	let total = line.price * (line.quantity as f64);

	// Replay the lifecycle so history matches the status.
	let mut history = vec![StatusChange { status: OrderStatus::Pending, at: placed }];
	let mut current = OrderStatus::Pending;
	while current != status {
		match current.next() {
			Some(next) => {
				current = next;
				history.push(StatusChange {
					status: next,
					at: delivered.filter(|_| next == OrderStatus::Delivered).unwrap_or(placed),
				});
			}
			None => {
				break;
			}
		}
	}

	Order {
		tracking_id: format!("TRK{}", id),
		id,
		buyer_id: buyer_id.to_string(),
		seller_id: "1".to_string(),
		products: vec![line],
		shipping: 0.0,
		total_amount: total,
		status,
		payment_status: PaymentStatus::Completed,
		shipping_address: address.to_string(),
		order_date: placed,
		expected_delivery: expected,
		delivery_date: delivered,
		progress: status.progress(),
		step_history: history,
	}
}

pub fn seed_orders() -> Vec<Order> {
	vec![
		seed_order(
			1,
			"2",
			OrderLine { product_id: "1".to_string(), quantity: 500, price: 120.0 },
			OrderStatus::Shipped,
			"Delhi, India",
			at(2025, 1, 18, 10, 30),
			at(2025, 1, 25, 15, 45),
			None
		),
		seed_order(
			2,
			"2",
			OrderLine { product_id: "3".to_string(), quantity: 300, price: 28.0 },
			OrderStatus::Confirmed,
			"Mumbai, India",
			at(2025, 1, 20, 14, 20),
			at(2025, 1, 27, 12, 0),
			None
		),
		seed_order(
			3,
			"3",
			OrderLine { product_id: "5".to_string(), quantity: 100, price: 25.0 },
			OrderStatus::Delivered,
			"Gujarat, India",
			at(2025, 1, 15, 9, 15),
			at(2025, 1, 20, 10, 0),
			Some(at(2025, 1, 19, 14, 30))
		)
	]
}

pub fn new_product_id() -> String {
	Uuid::new_v4().to_string()
}

pub fn new_user_id() -> String {
	Uuid::new_v4().to_string()
}

pub fn new_order_id() -> String {
	let suffix = Uuid::new_v4().simple().to_string();
	format!("ORD-{}", suffix[..8].to_uppercase())
}

pub fn new_token() -> String {
	format!("mock_token_{}", Uuid::new_v4().simple())
}

pub fn new_transaction_id() -> String {
	format!("TXN_{}", Uuid::new_v4().simple())
}
