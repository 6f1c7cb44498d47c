//! Non-interactive subcommands.

use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use std::collections::HashSet;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::data::cart::cart_total;
use crate::data::types::{CartItem, Product};
use crate::data::{AuthRepository, CartRepository, ProductsRepository};
use crate::db::ProductsDao;
use crate::network::NetworkResult;
use crate::ui::renderfns::{format_price, truncate};

/// How long `products` waits for the background cache write before exiting
const CACHE_WAIT: Duration = Duration::from_secs(2);

/// Print outcomes until the first one that is not `Loading`.
///
/// The offline cache stream never ends on its own, so the stream is
/// dropped after the first terminal item.
pub async fn products(repo: &dyn ProductsRepository, cache: &ProductsDao) -> Result<()> {
  let mut outcomes = repo.fetch_products();

  while let Some(outcome) = outcomes.next().await {
    match outcome {
      NetworkResult::Loading => eprintln!("Loading products..."),
      NetworkResult::Success(products) => {
        print_products(&products);
        if !wait_until_cached(cache, &products, CACHE_WAIT).await {
          warn!(count = products.len(), "Catalog was not cached before exit");
        }
        return Ok(());
      }
      failure => return Err(eyre!("Could not load products: {}", failure)),
    }
  }

  Err(eyre!("Product stream ended without a result"))
}

/// Wait for every fetched row to show up in the cache. `false` on timeout.
async fn wait_until_cached(cache: &ProductsDao, products: &[Product], timeout: Duration) -> bool {
  let wanted: HashSet<i64> = products.iter().map(|p| p.id).collect();
  let mut snapshots = cache.cache_products();

  let landed = tokio::time::timeout(timeout, async {
    while let Some(rows) = snapshots.next().await {
      let cached: HashSet<i64> = rows.iter().map(|p| p.id).collect();
      if wanted.is_subset(&cached) {
        return true;
      }
    }
    false
  })
  .await
  .unwrap_or(false);

  if landed {
    debug!(count = wanted.len(), "Catalog cached");
  }
  landed
}

fn print_products(products: &[Product]) {
  if products.is_empty() {
    println!("No products available.");
    return;
  }
  for product in products {
    println!(
      "{:>5}  {:>10}  {:<18} {}",
      product.id,
      format_price(product.price),
      truncate(&product.category, 18),
      truncate(&product.title, 60)
    );
  }
}

/// Sign in with the password from the environment, else the saved one.
pub async fn login(auth: &AuthRepository, username: &str) -> Result<()> {
  let password = match Config::get_password() {
    Some(password) => password,
    None => match auth.saved_credentials()? {
      (Some(saved_user), Some(password)) if saved_user == username => password,
      _ => return Err(eyre!("No password. Set QUICKMART_PASSWORD")),
    },
  };

  match auth.sign_in(username, &password).await {
    NetworkResult::Success(session) => {
      println!("Signed in as {}", session.username);
      Ok(())
    }
    failure => Err(eyre!("Sign-in failed: {}", failure)),
  }
}

/// Register with the password from the environment.
pub async fn signup(auth: &AuthRepository, email: &str, username: &str) -> Result<()> {
  let password = Config::get_password().ok_or_else(|| eyre!("No password. Set QUICKMART_PASSWORD"))?;

  match auth.sign_up(email, username, &password).await {
    NetworkResult::Success(account) => {
      println!("Created account {} (id {})", account.username, account.id);
      Ok(())
    }
    failure => Err(eyre!("Sign-up failed: {}", failure)),
  }
}

pub fn logout(auth: &AuthRepository, forget: bool) -> Result<()> {
  if forget {
    auth.forget_user()?;
    println!("Signed out and forgot saved credentials");
  } else {
    auth.sign_out()?;
    println!("Signed out");
  }
  Ok(())
}

pub fn cart_list(cart: &CartRepository) -> Result<()> {
  let items = cart.items()?;
  if items.is_empty() {
    println!("Cart is empty.");
    return Ok(());
  }

  for item in &items {
    println!(
      "{:>5}  {:>3} x {:>10}  {:>11}  {}",
      item.id,
      item.quantity,
      format_price(item.price),
      format_price(item.line_total()),
      truncate(&item.title, 50)
    );
  }
  println!("Total: {}", format_price(cart.total()?));
  Ok(())
}

/// Add a product from the local catalog cache.
pub fn cart_add(cart: &CartRepository, products: &ProductsDao, id: i64, quantity: i64) -> Result<()> {
  let product = products
    .get(id)?
    .ok_or_else(|| eyre!("Product {} is not in the local catalog. Run `quickmart products` first", id))?;

  let stored = cart.add_to_cart(&CartItem::from_product(&product, quantity))?;
  println!("{} x {}", stored.quantity, stored.title);
  Ok(())
}

pub fn cart_remove(cart: &CartRepository, id: i64) -> Result<()> {
  let item = cart
    .get_cart_item(id)?
    .ok_or_else(|| eyre!("Product {} is not in the cart", id))?;

  cart.remove_cart_item(id)?;
  println!("Removed {}", item.title);
  Ok(())
}

pub fn cart_clear(cart: &CartRepository) -> Result<()> {
  cart.clear_cart()?;
  println!("Cart cleared");
  Ok(())
}

/// Place an order for the whole cart once `confirm` accepts the total.
pub fn checkout(cart: &CartRepository, confirm: impl FnOnce(f64) -> Result<bool>) -> Result<()> {
  let items = cart.items()?;
  if items.is_empty() {
    println!("Cart is empty, nothing to order.");
    return Ok(());
  }

  if !confirm(cart_total(&items))? {
    println!("Order cancelled");
    return Ok(());
  }

  match cart.place_order()? {
    Some(receipt) => println!(
      "Your order was successful! {} line(s), total {}",
      receipt.items.len(),
      format_price(receipt.total)
    ),
    None => println!("Cart is empty, nothing to order."),
  }
  Ok(())
}

/// Anything but y or yes declines.
pub fn confirm_on_stdin(total: f64) -> Result<bool> {
  print!("Place order for {}? [y/N] ", format_price(total));
  io::stdout().flush()?;

  let mut answer = String::new();
  io::stdin().read_line(&mut answer)?;
  Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
