use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use futures::stream::BoxStream;
use tracing::info;

use crate::data::types::{CartItem, OrderReceipt};
use crate::db::CartDao;

/// Cart operations on top of the local store.
#[derive(Clone)]
pub struct CartRepository {
  cart_dao: CartDao,
}

impl CartRepository {
  pub fn new(cart_dao: CartDao) -> Self {
    Self { cart_dao }
  }

  /// Add `item.quantity` units of a product. An existing line for the same
  /// product is increased instead of duplicated.
  pub fn add_to_cart(&self, item: &CartItem) -> Result<CartItem> {
    if item.quantity < 1 {
      return Err(eyre!(
        "Quantity must be at least 1, got {} for product {}",
        item.quantity,
        item.id
      ));
    }

    let stored = self.cart_dao.upsert_add(item)?;
    info!(product = stored.id, quantity = stored.quantity, "Added to cart");
    Ok(stored)
  }

  pub fn get_cart_item(&self, item_id: i64) -> Result<Option<CartItem>> {
    self.cart_dao.get_cart_item(item_id)
  }

  pub fn get_all_cart_items(&self) -> BoxStream<'static, Vec<CartItem>> {
    self.cart_dao.get_all_cart_items()
  }

  pub fn items(&self) -> Result<Vec<CartItem>> {
    self.cart_dao.all()
  }

  pub fn remove_cart_item(&self, item_id: i64) -> Result<bool> {
    let removed = self.cart_dao.delete_cart_item(item_id)?;
    if removed {
      info!(product = item_id, "Removed from cart");
    }
    Ok(removed)
  }

  pub fn clear_cart(&self) -> Result<()> {
    let removed = self.cart_dao.delete_all_cart_items()?;
    info!(lines = removed, "Cleared cart");
    Ok(())
  }

  pub fn total(&self) -> Result<f64> {
    Ok(cart_total(&self.cart_dao.all()?))
  }

  /// Check out every line and empty the cart. `None` if it was already empty.
  pub fn place_order(&self) -> Result<Option<OrderReceipt>> {
    let items = self.cart_dao.take_all()?;
    if items.is_empty() {
      return Ok(None);
    }

    let receipt = OrderReceipt {
      total: cart_total(&items),
      items,
      placed_at: Utc::now(),
    };
    info!(lines = receipt.items.len(), total = receipt.total, "Placed order");
    Ok(Some(receipt))
  }
}

pub fn cart_total(items: &[CartItem]) -> f64 {
  items.iter().map(CartItem::line_total).sum()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use futures::StreamExt;

  fn repository() -> CartRepository {
    CartRepository::new(Database::open_in_memory().unwrap().cart())
  }

  fn item(id: i64, price: f64, quantity: i64) -> CartItem {
    CartItem {
      id,
      title: "Jacket".to_string(),
      price,
      image: "image+url".to_string(),
      quantity,
    }
  }

  #[test]
  fn test_add_to_cart_inserts_item() {
    let repo = repository();

    repo.add_to_cart(&item(1, 100.0, 1)).unwrap();

    assert_eq!(repo.get_cart_item(1).unwrap(), Some(item(1, 100.0, 1)));
  }

  #[test]
  fn test_add_same_product_increments_quantity() {
    let repo = repository();

    repo.add_to_cart(&item(1, 100.0, 1)).unwrap();
    let stored = repo.add_to_cart(&item(1, 100.0, 1)).unwrap();

    assert_eq!(stored.quantity, 2);
    assert_eq!(repo.items().unwrap().len(), 1);
  }

  #[test]
  fn test_add_rejects_zero_quantity() {
    let repo = repository();
    assert!(repo.add_to_cart(&item(1, 100.0, 0)).is_err());
    assert!(repo.items().unwrap().is_empty());
  }

  #[test]
  fn test_get_cart_item_returns_none_if_missing() {
    assert_eq!(repository().get_cart_item(1).unwrap(), None);
  }

  #[test]
  fn test_remove_cart_item() {
    let repo = repository();
    repo.add_to_cart(&item(1, 100.0, 1)).unwrap();

    assert!(repo.remove_cart_item(1).unwrap());
    assert_eq!(repo.get_cart_item(1).unwrap(), None);
  }

  #[test]
  fn test_total() {
    let repo = repository();
    repo.add_to_cart(&item(1, 200.0, 1)).unwrap();
    repo.add_to_cart(&item(2, 50.0, 3)).unwrap();

    assert_eq!(repo.total().unwrap(), 350.0);
  }

  #[test]
  fn test_place_order_empties_cart_and_reports_total() {
    let repo = repository();
    repo.add_to_cart(&item(1, 200.0, 1)).unwrap();
    repo.add_to_cart(&item(2, 50.0, 3)).unwrap();

    let receipt = repo.place_order().unwrap().unwrap();

    assert_eq!(receipt.total, 350.0);
    assert_eq!(receipt.items, vec![item(1, 200.0, 1), item(2, 50.0, 3)]);
    assert!(repo.items().unwrap().is_empty());
  }

  #[test]
  fn test_place_order_on_empty_cart_is_none() {
    assert_eq!(repository().place_order().unwrap(), None);
  }

  #[tokio::test]
  async fn test_get_all_cart_items_follows_changes() {
    let repo = repository();
    let mut stream = repo.get_all_cart_items();
    assert!(stream.next().await.unwrap().is_empty());

    repo.add_to_cart(&item(1, 200.0, 1)).unwrap();
    assert_eq!(stream.next().await.unwrap(), vec![item(1, 200.0, 1)]);

    repo.clear_cart().unwrap();
    assert!(stream.next().await.unwrap().is_empty());
  }
}
