use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use futures::stream::BoxStream;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database, Table};
use crate::data::types::Product;

const SELECT_PRODUCT: &str =
  "SELECT id, title, description, category, price, image FROM products";

/// Access to the cached catalog
#[derive(Clone)]
pub struct ProductsDao {
  db: Database,
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
  Ok(Product {
    id: row.get(0)?,
    title: row.get(1)?,
    description: row.get(2)?,
    category: row.get(3)?,
    price: row.get(4)?,
    image: row.get(5)?,
  })
}

impl ProductsDao {
  pub(super) fn new(db: Database) -> Self {
    Self { db }
  }

  /// Insert rows, replacing any existing row with the same id.
  pub fn insert(&self, products: &[Product]) -> Result<()> {
    self.db.with_conn(|conn| {
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

      for product in products {
        tx.execute(
          "INSERT OR REPLACE INTO products (id, title, description, category, price, image, cached_at)
           VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
          params![
            product.id,
            product.title,
            product.description,
            product.category,
            product.price,
            product.image
          ],
        )
        .map_err(|e| eyre!("Failed to store product {}: {}", product.id, e))?;
      }

      tx.commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))
    })?;

    self.db.notify(Table::Products);
    Ok(())
  }

  pub fn get(&self, id: i64) -> Result<Option<Product>> {
    self.db.with_conn(|conn| {
      conn
        .query_row(
          &format!("{} WHERE id = ?", SELECT_PRODUCT),
          params![id],
          product_from_row,
        )
        .optional()
        .map_err(|e| eyre!("Failed to query product {}: {}", id, e))
    })
  }

  /// Every cached product, ordered by id.
  pub fn all(&self) -> Result<Vec<Product>> {
    self.db.with_conn(|conn| {
      let mut stmt = conn
        .prepare(&format!("{} ORDER BY id", SELECT_PRODUCT))
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      let products = stmt
        .query_map([], product_from_row)
        .map_err(|e| eyre!("Failed to query products: {}", e))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| eyre!("Failed to read product row: {}", e))?;

      Ok(products)
    })
  }

  /// Distinct non-empty categories of the cached catalog, sorted.
  pub fn categories(&self) -> Result<Vec<String>> {
    self.db.with_conn(|conn| {
      let mut stmt = conn
        .prepare("SELECT DISTINCT category FROM products WHERE category <> '' ORDER BY category")
        .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

      let categories = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| eyre!("Failed to query categories: {}", e))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| eyre!("Failed to read category row: {}", e))?;

      Ok(categories)
    })
  }

  /// When the newest cached row was written, if any.
  pub fn last_cached_at(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self.db.with_conn(|conn| {
      conn
        .query_row("SELECT MAX(cached_at) FROM products", [], |row| row.get(0))
        .map_err(|e| eyre!("Failed to query cache age: {}", e))
    })?;

    raw.as_deref().map(parse_datetime).transpose()
  }

  /// Continuous query over the whole table: the current rows, then the rows
  /// again after every write.
  pub fn cache_products(&self) -> BoxStream<'static, Vec<Product>> {
    self.db.observe(Table::Products, |db| db.products().all())
  }

  pub fn cache_categories(&self) -> BoxStream<'static, Vec<String>> {
    self.db.observe(Table::Products, |db| db.products().categories())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;

  fn product(id: i64, title: &str) -> Product {
    Product {
      id,
      title: title.to_string(),
      description: format!("Description {}", id),
      category: "Category 1".to_string(),
      price: 100.0,
      image: "image_url".to_string(),
    }
  }

  #[test]
  fn test_insert_and_read_back() {
    let dao = Database::open_in_memory().unwrap().products();

    dao.insert(&[product(1, "Product 1")]).unwrap();

    let products = dao.all().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Product 1");
    assert_eq!(dao.get(1).unwrap(), Some(product(1, "Product 1")));
    assert_eq!(dao.get(2).unwrap(), None);
  }

  #[test]
  fn test_insert_replaces_same_id_and_keeps_others() {
    let dao = Database::open_in_memory().unwrap().products();

    dao
      .insert(&[product(1, "Old"), product(2, "Untouched")])
      .unwrap();
    dao.insert(&[product(1, "New")]).unwrap();

    let titles: Vec<_> = dao.all().unwrap().into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["New", "Untouched"]);
  }

  #[test]
  fn test_categories_are_distinct_and_sorted() {
    let dao = Database::open_in_memory().unwrap().products();
    let mut shoes = product(1, "Shoes");
    shoes.category = "men's clothing".to_string();
    let mut ring = product(2, "Ring");
    ring.category = "jewelery".to_string();
    let mut boots = product(3, "Boots");
    boots.category = "men's clothing".to_string();
    let mut unsorted = product(4, "Loose");
    unsorted.category = String::new();

    dao.insert(&[shoes, ring, boots, unsorted]).unwrap();

    assert_eq!(dao.categories().unwrap(), vec!["jewelery", "men's clothing"]);
  }

  #[test]
  fn test_last_cached_at() {
    let dao = Database::open_in_memory().unwrap().products();
    assert_eq!(dao.last_cached_at().unwrap(), None);

    dao.insert(&[product(1, "Product 1")]).unwrap();
    assert!(dao.last_cached_at().unwrap().is_some());
  }

  #[tokio::test]
  async fn test_cache_products_empty_list() {
    let dao = Database::open_in_memory().unwrap().products();

    let products = dao.cache_products().next().await.unwrap();

    assert!(products.is_empty());
  }

  #[tokio::test]
  async fn test_cache_products_emits_on_write() {
    let dao = Database::open_in_memory().unwrap().products();
    let mut stream = dao.cache_products();

    assert!(stream.next().await.unwrap().is_empty());

    dao.insert(&[product(7, "Fresh")]).unwrap();

    let products = stream.next().await.unwrap();
    assert_eq!(products, vec![product(7, "Fresh")]);
  }
}
