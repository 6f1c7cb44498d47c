use chrono::{DateTime, Utc};

/// Catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub category: String,
  pub price: f64,
  pub image: String, // URI
}

/// One line of the cart, keyed by product id
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
  pub id: i64,
  pub title: String,
  pub price: f64,
  pub image: String,
  pub quantity: i64, // >= 1
}

impl CartItem {
  pub fn from_product(product: &Product, quantity: i64) -> Self {
    Self {
      id: product.id,
      title: product.title.clone(),
      price: product.price,
      image: product.image.clone(),
      quantity,
    }
  }

  pub fn line_total(&self) -> f64 {
    self.price * self.quantity as f64
  }
}

/// Signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
  pub username: String,
  pub token: String,
  pub signed_in_at: DateTime<Utc>,
}

/// A newly registered user
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
  pub id: i64,
  pub username: String,
  pub email: String,
}

/// What a placed order contained
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
  pub items: Vec<CartItem>,
  pub total: f64,
  pub placed_at: DateTime<Utc>,
}
