use color_eyre::{eyre::eyre, Result};
use futures::stream::BoxStream;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, Table};
use crate::data::types::CartItem;

const SELECT_ITEM: &str = "SELECT id, title, price, image, quantity FROM cart_items";

/// Access to the persisted cart
#[derive(Clone)]
pub struct CartDao {
  db: Database,
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<CartItem> {
  Ok(CartItem {
    id: row.get(0)?,
    title: row.get(1)?,
    price: row.get(2)?,
    image: row.get(3)?,
    quantity: row.get(4)?,
  })
}

impl CartDao {
  pub(super) fn new(db: Database) -> Self {
    Self { db }
  }

  /// Insert a line, or add `item.quantity` to the existing line for that
  /// product. Returns the resulting line.
  pub fn upsert_add(&self, item: &CartItem) -> Result<CartItem> {
    let stored = self.db.with_conn(|conn| {
      conn
        .execute(
          "INSERT INTO cart_items (id, title, price, image, quantity)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             price = excluded.price,
             image = excluded.image,
             quantity = cart_items.quantity + excluded.quantity",
          params![item.id, item.title, item.price, item.image, item.quantity],
        )
        .map_err(|e| eyre!("Failed to add cart item {}: {}", item.id, e))?;

      conn
        .query_row(
          &format!("{} WHERE id = ?", SELECT_ITEM),
          params![item.id],
          item_from_row,
        )
        .map_err(|e| eyre!("Failed to read back cart item {}: {}", item.id, e))
    })?;

    self.db.notify(Table::Cart);
    Ok(stored)
  }

  pub fn get_cart_item(&self, id: i64) -> Result<Option<CartItem>> {
    self.db.with_conn(|conn| {
      conn
        .query_row(
          &format!("{} WHERE id = ?", SELECT_ITEM),
          params![id],
          item_from_row,
        )
        .optional()
        .map_err(|e| eyre!("Failed to query cart item {}: {}", id, e))
    })
  }

  pub fn all(&self) -> Result<Vec<CartItem>> {
    self.db.with_conn(|conn| {
      let mut stmt = conn
        .prepare(&format!("{} ORDER BY id", SELECT_ITEM))
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      let items = stmt
        .query_map([], item_from_row)
        .map_err(|e| eyre!("Failed to query cart items: {}", e))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| eyre!("Failed to read cart row: {}", e))?;

      Ok(items)
    })
  }

  /// Continuous query over the cart.
  pub fn get_all_cart_items(&self) -> BoxStream<'static, Vec<CartItem>> {
    self.db.observe(Table::Cart, |db| db.cart().all())
  }

  /// Returns whether a line was removed.
  pub fn delete_cart_item(&self, id: i64) -> Result<bool> {
    let removed = self.db.with_conn(|conn| {
      conn
        .execute("DELETE FROM cart_items WHERE id = ?", params![id])
        .map_err(|e| eyre!("Failed to delete cart item {}: {}", id, e))
    })?;

    if removed > 0 {
      self.db.notify(Table::Cart);
    }
    Ok(removed > 0)
  }

  pub fn delete_all_cart_items(&self) -> Result<usize> {
    let removed = self.db.with_conn(|conn| {
      conn
        .execute("DELETE FROM cart_items", [])
        .map_err(|e| eyre!("Failed to clear cart: {}", e))
    })?;

    self.db.notify(Table::Cart);
    Ok(removed)
  }

  /// Read every line and empty the cart in one transaction.
  pub fn take_all(&self) -> Result<Vec<CartItem>> {
    let items = self.db.with_conn(|conn| {
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

      let items = {
        let mut stmt = tx
          .prepare(&format!("{} ORDER BY id", SELECT_ITEM))
          .map_err(|e| eyre!("Failed to prepare query: {}", e))?;
        let rows = stmt
          .query_map([], item_from_row)
          .map_err(|e| eyre!("Failed to query cart items: {}", e))?
          .collect::<rusqlite::Result<Vec<_>>>()
          .map_err(|e| eyre!("Failed to read cart row: {}", e))?;
        rows
      }; // stmt borrows tx and must go before commit

      tx.execute("DELETE FROM cart_items", [])
        .map_err(|e| eyre!("Failed to clear cart: {}", e))?;
      tx.commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

      Ok(items)
    })?;

    if !items.is_empty() {
      self.db.notify(Table::Cart);
    }
    Ok(items)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;

  fn item(id: i64, title: &str, price: f64, quantity: i64) -> CartItem {
    CartItem {
      id,
      title: title.to_string(),
      price,
      image: format!("image{}", id),
      quantity,
    }
  }

  #[test]
  fn test_upsert_add_and_get_cart_item() {
    let dao = Database::open_in_memory().unwrap().cart();

    dao.upsert_add(&item(1, "Item 1", 200.0, 2)).unwrap();

    let fetched = dao.get_cart_item(1).unwrap().unwrap();
    assert_eq!(fetched.title, "Item 1");
    assert_eq!(fetched.price, 200.0);
    assert_eq!(fetched.quantity, 2);
  }

  #[test]
  fn test_upsert_add_accumulates_quantity() {
    let dao = Database::open_in_memory().unwrap().cart();

    dao.upsert_add(&item(1, "Item 1", 100.0, 1)).unwrap();
    let stored = dao.upsert_add(&item(1, "Item 1", 90.0, 2)).unwrap();

    assert_eq!(stored.quantity, 3);
    assert_eq!(stored.price, 90.0);
    assert_eq!(dao.all().unwrap().len(), 1);
  }

  #[test]
  fn test_zero_quantity_violates_check() {
    let dao = Database::open_in_memory().unwrap().cart();
    assert!(dao.upsert_add(&item(1, "Item 1", 100.0, 0)).is_err());
    assert!(dao.all().unwrap().is_empty());
  }

  #[test]
  fn test_delete_cart_item() {
    let dao = Database::open_in_memory().unwrap().cart();

    dao.upsert_add(&item(1, "Item 1", 100.0, 1)).unwrap();

    assert!(dao.delete_cart_item(1).unwrap());
    assert!(!dao.delete_cart_item(1).unwrap());
    assert_eq!(dao.get_cart_item(1).unwrap(), None);
  }

  #[tokio::test]
  async fn test_delete_all_cart_items() {
    let dao = Database::open_in_memory().unwrap().cart();

    dao.upsert_add(&item(1, "Item 1", 100.0, 1)).unwrap();
    dao.upsert_add(&item(2, "Item 2", 200.0, 2)).unwrap();
    assert_eq!(dao.delete_all_cart_items().unwrap(), 2);

    let items = dao.get_all_cart_items().next().await.unwrap();
    assert!(items.is_empty());
  }

  #[tokio::test]
  async fn test_take_all_returns_lines_and_empties_cart() {
    let dao = Database::open_in_memory().unwrap().cart();
    dao.upsert_add(&item(2, "Item 2", 200.0, 2)).unwrap();
    dao.upsert_add(&item(1, "Item 1", 100.0, 1)).unwrap();
    let mut stream = dao.get_all_cart_items();
    assert_eq!(stream.next().await.unwrap().len(), 2);

    let taken = dao.take_all().unwrap();

    assert_eq!(taken, vec![item(1, "Item 1", 100.0, 1), item(2, "Item 2", 200.0, 2)]);
    assert!(dao.all().unwrap().is_empty());
    assert!(stream.next().await.unwrap().is_empty());
  }

  #[test]
  fn test_take_all_on_empty_cart() {
    let dao = Database::open_in_memory().unwrap().cart();
    assert!(dao.take_all().unwrap().is_empty());
  }
}
