//! Serde-deserializable types matching QuickMart API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Serialize};

use crate::data::types::Product;

// ============================================================================
// Products endpoint
// ============================================================================

/// One element of the `GET /products` array.
///
/// Unknown fields (the API also sends a `rating` object) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductDto {
  pub id: i64,
  pub title: String,
  pub price: f64,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub image: String,
}

// ============================================================================
// Auth endpoint
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
  pub username: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  pub token: String,
}

/// Body of `POST /users`.
#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
  pub email: &'a str,
  pub username: &'a str,
  pub password: &'a str,
}

/// The API echoes back only the id of the new user.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
  pub id: i64,
}

// ============================================================================
// Error payloads
// ============================================================================

/// Structured error body some endpoints return alongside a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
  pub message: Option<String>,
  pub error: Option<String>,
  pub status: Option<u16>,
}

impl ErrorResponse {
  /// Best human-readable description carried by the body.
  pub fn description(&self) -> Option<&str> {
    self.message.as_deref().or(self.error.as_deref())
  }
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ProductDto> for Product {
  fn from(dto: ProductDto) -> Self {
    Product {
      id: dto.id,
      title: dto.title,
      description: dto.description,
      category: dto.category,
      price: dto.price,
      image: dto.image,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_product_ignores_unknown_fields() {
    let json = r#"{"id":3,"title":"Jacket","price":55.99,"category":"men's clothing",
      "description":"warm","image":"https://x/3.jpg","rating":{"rate":4.7,"count":500}}"#;
    let dto: ProductDto = serde_json::from_str(json).unwrap();
    assert_eq!(dto.id, 3);
    assert_eq!(dto.category, "men's clothing");
  }

  #[test]
  fn test_sign_up_request_shape() {
    let body = serde_json::to_value(SignUpRequest {
      email: "john@gmail.com",
      username: "johnd",
      password: "m38rmF$",
    })
    .unwrap();
    assert_eq!(
      body,
      serde_json::json!({"email": "john@gmail.com", "username": "johnd", "password": "m38rmF$"})
    );
  }

  #[test]
  fn test_error_description_prefers_message() {
    let body = ErrorResponse {
      message: Some("bad token".to_string()),
      error: Some("Unauthorized".to_string()),
      status: Some(401),
    };
    assert_eq!(body.description(), Some("bad token"));

    let body = ErrorResponse {
      error: Some("Unauthorized".to_string()),
      ..Default::default()
    };
    assert_eq!(body.description(), Some("Unauthorized"));
  }
}
