//! Client-side product filtering and sorting. Everything here is pure:
//! inputs are borrowed, the result is a new list in catalog order.

use std::cmp::Ordering;

use serde::{ Deserialize, Serialize };

use crate::models::{ Grade, Product };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
	Organic,
	#[serde(untagged)]
	Grade(Grade),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
	pub search: Option<String>,
	pub category: Option<String>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
	pub quality: Option<Quality>,
}

impl ProductFilter {
	pub fn is_empty(&self) -> bool {
		self.search.is_none() &&
			self.category.is_none() &&
			self.min_price.is_none() &&
			self.max_price.is_none() &&
			self.quality.is_none()
	}

	/// True when the product satisfies every supplied predicate.
	pub fn matches(&self, product: &Product) -> bool {
		if let Some(search) = &self.search {
			if !matches_text(product, search) {
				return false;
			}
		}
		if let Some(category) = &self.category {
			if !contains_ignore_case(&product.category, category) {
				return false;
			}
		}
		if let Some(min) = self.min_price {
			if product.price < min {
				return false;
			}
		}
		if let Some(max) = self.max_price {
			if product.price > max {
				return false;
			}
		}
		match self.quality {
			Some(Quality::Organic) => product.organic_certified,
			Some(Quality::Grade(grade)) => product.agmark_grade == grade,
			None => true,
		}
	}
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
	haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Free-text match over title and description.
pub fn matches_text(product: &Product, text: &str) -> bool {
	contains_ignore_case(&product.title, text) || contains_ignore_case(&product.description, text)
}

/// Stable filter; an empty filter returns the list unchanged.
pub fn apply(products: &[Product], filter: &ProductFilter) -> Vec<Product> {
	products
		.iter()
		.filter(|product| filter.matches(product))
		.cloned()
		.collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	Newest,
	PriceLowToHigh,
	PriceHighToLow,
	BestGrade,
}

/// Stable sort; ties keep their incoming order.
pub fn sort_products(products: &mut [Product], order: SortOrder) {
	match order {
		SortOrder::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
		SortOrder::PriceLowToHigh =>
			products.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal)),
		SortOrder::PriceHighToLow =>
			products.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal)),
		SortOrder::BestGrade => products.sort_by(|a, b| b.agmark_grade.cmp(&a.agmark_grade)),
	}
}
