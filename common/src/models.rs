use std::fmt;
use std::str::FromStr;

use chrono::{ DateTime, NaiveDate, Utc };
use serde::{ Deserialize, Serialize };

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Farmer,
	Buyer,
	Admin,
}

impl FromStr for Role {
	type Err = StoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"farmer" => Ok(Role::Farmer),
			"buyer" => Ok(Role::Buyer),
			"admin" => Ok(Role::Admin),
			other => Err(StoreError::Auth(format!("unrecognized role '{}'", other))),
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Role::Farmer => "farmer",
			Role::Buyer => "buyer",
			Role::Admin => "admin",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: String,
	pub name: String,
	pub email: String,
	pub role: Role,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub farm_size: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub experience: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub company: Option<String>,
	#[serde(default)]
	pub profile_completed: bool,
}

/// Login form. The role arrives as free text so unknown roles can be rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
	pub email: String,
	pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
	pub name: String,
	pub email: String,
	pub role: Role,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	pub farm_size: Option<String>,
	#[serde(default)]
	pub experience: Option<String>,
	#[serde(default)]
	pub company: Option<String>,
}

/// Fields a user may fill in when completing their profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
	pub name: Option<String>,
	pub location: Option<String>,
	pub phone: Option<String>,
	pub farm_size: Option<String>,
	pub experience: Option<String>,
	pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub user: User,
	pub token: String,
}

/// AGMARK quality grade. Declared worst-first so the derived ordering
/// ranks `A+` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
	#[serde(rename = "C")]
	C,
	#[serde(rename = "B")]
	B,
	#[serde(rename = "B+")]
	BPlus,
	#[serde(rename = "A")]
	A,
	#[serde(rename = "A+")]
	APlus,
}

impl Grade {
	pub fn as_str(&self) -> &'static str {
		match self {
			Grade::APlus => "A+",
			Grade::A => "A",
			Grade::BPlus => "B+",
			Grade::B => "B",
			Grade::C => "C",
		}
	}
}

impl fmt::Display for Grade {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Grade {
	type Err = StoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"A+" => Ok(Grade::APlus),
			"A" => Ok(Grade::A),
			"B+" => Ok(Grade::BPlus),
			"B" => Ok(Grade::B),
			"C" => Ok(Grade::C),
			other => Err(StoreError::Validation(format!("unknown grade '{}'", other))),
		}
	}
}

/// Denormalized seller identity carried on every product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRef {
	pub id: String,
	pub name: String,
	pub email: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
}

impl From<&User> for SellerRef {
	fn from(user: &User) -> Self {
		Self {
			id: user.id.clone(),
			name: user.name.clone(),
			email: user.email.clone(),
			location: user.location.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
	pub id: String,
	pub title: String,
	pub description: String,
	pub price: f64,
	pub stock: u32,
	pub unit: String,
	pub images: Vec<String>,
	pub category: String,
	pub category_id: String,
	pub seller: SellerRef,
	pub agmark_grade: Grade,
	pub harvest_date: NaiveDate,
	pub location: String,
	pub organic_certified: bool,
	pub created_at: DateTime<Utc>,
}

/// Listing form submitted by a farmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
	pub title: String,
	pub description: String,
	pub price: f64,
	pub stock: u32,
	pub unit: String,
	#[serde(default)]
	pub images: Vec<String>,
	pub category: String,
	pub category_id: String,
	pub harvest_date: NaiveDate,
	pub location: String,
	#[serde(default)]
	pub agmark_grade: Option<Grade>,
	#[serde(default)]
	pub organic_certified: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
	pub title: Option<String>,
	pub description: Option<String>,
	pub price: Option<f64>,
	pub stock: Option<u32>,
	pub unit: Option<String>,
	pub images: Option<Vec<String>>,
	pub category: Option<String>,
	pub category_id: Option<String>,
	pub agmark_grade: Option<Grade>,
	pub harvest_date: Option<NaiveDate>,
	pub location: Option<String>,
	pub organic_certified: Option<bool>,
}

impl ProductPatch {
	pub fn apply(self, product: &mut Product) {
		if let Some(title) = self.title {
			product.title = title;
		}
		if let Some(description) = self.description {
			product.description = description;
		}
		if let Some(price) = self.price {
			product.price = price;
		}
		if let Some(stock) = self.stock {
			product.stock = stock;
		}
		if let Some(unit) = self.unit {
			product.unit = unit;
		}
		if let Some(images) = self.images {
			product.images = images;
		}
		if let Some(category) = self.category {
			product.category = category;
		}
		if let Some(category_id) = self.category_id {
			product.category_id = category_id;
		}
		if let Some(grade) = self.agmark_grade {
			product.agmark_grade = grade;
		}
		if let Some(harvest_date) = self.harvest_date {
			product.harvest_date = harvest_date;
		}
		if let Some(location) = self.location {
			product.location = location;
		}
		if let Some(organic) = self.organic_certified {
			product.organic_certified = organic;
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
	pub id: String,
	pub name: String,
	pub description: String,
}

/// Server-side listing query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
	pub category: Option<String>,
	pub search: Option<String>,
	/// Restrict to products authored by the current user.
	#[serde(default)]
	pub mine: bool,
	pub limit: Option<usize>,
	pub page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
	pub products: Vec<T>,
	pub total: usize,
	pub page: usize,
	pub total_pages: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
	#[default]
	Razorpay,
	Upi,
	Card,
	NetBanking,
	CashOnDelivery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
	pub success: bool,
	pub transaction_id: String,
	pub payment_method: PaymentMethod,
	pub amount_minor_units: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn grade_order_ranks_a_plus_highest() {
		let mut grades = vec![Grade::B, Grade::APlus, Grade::C, Grade::A, Grade::BPlus];
		grades.sort();
		assert_eq!(grades, vec![Grade::C, Grade::B, Grade::BPlus, Grade::A, Grade::APlus]);
		assert!(Grade::APlus > Grade::A);
	}

	#[test]
	fn grade_serializes_as_label() {
		assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
		let grade: Grade = serde_json::from_str("\"B+\"").unwrap();
		assert_eq!(grade, Grade::BPlus);
		assert_eq!("A".parse::<Grade>().unwrap(), Grade::A);
		assert!("D".parse::<Grade>().is_err());
	}

	#[test]
	fn role_parsing_rejects_unknown() {
		assert_eq!("Farmer".parse::<Role>().unwrap(), Role::Farmer);
		assert!(matches!("guest".parse::<Role>(), Err(StoreError::Auth(_))));
	}

	#[test]
	fn user_uses_camel_case_fields() {
		let user = User {
			id: "1".to_string(),
			name: "Test".to_string(),
			email: "t@example.com".to_string(),
			role: Role::Farmer,
			location: None,
			phone: None,
			farm_size: Some("10 acres".to_string()),
			experience: None,
			company: None,
			profile_completed: false,
		};
		let json = serde_json::to_value(&user).unwrap();
		assert_eq!(json["farmSize"], "10 acres");
		assert_eq!(json["role"], "farmer");
		assert!(json.get("phone").is_none());
	}
}
