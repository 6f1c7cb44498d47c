//! Product catalog source: network first, local cache when offline.

use color_eyre::Result;
use futures::future::ready;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::data::types::Product;
use crate::db::ProductsDao;
use crate::network::{safe_api_call, NetworkMonitor, NetworkResult, QuickMartApi};

pub type ProductsOutcome = NetworkResult<Vec<Product>>;

pub trait ProductsRepository: Send + Sync {
  /// Fetch the catalog.
  ///
  /// The first item is always `Loading`. Online, exactly one more item follows
  /// and the stream ends. Offline, every cache snapshot is emitted as
  /// `Success` until the stream is dropped.
  fn fetch_products(&self) -> BoxStream<'static, ProductsOutcome>;

  fn save_products(&self, products: &[Product]) -> Result<()>;
}

#[derive(Clone)]
pub struct ProductsRepositoryImpl {
  api: Arc<dyn QuickMartApi>,
  products_dao: ProductsDao,
  network: Arc<dyn NetworkMonitor>,
}

impl ProductsRepositoryImpl {
  pub fn new(
    api: Arc<dyn QuickMartApi>,
    products_dao: ProductsDao,
    network: Arc<dyn NetworkMonitor>,
  ) -> Self {
    Self {
      api,
      products_dao,
      network,
    }
  }

  /// Hand rows to the store without waiting for the write.
  fn persist_in_background(&self, products: Vec<Product>) {
    let repo = self.clone();
    tokio::task::spawn_blocking(move || match repo.save_products(&products) {
      Ok(()) => debug!(count = products.len(), "Cached fetched products"),
      Err(e) => error!(error = %e, "Failed to cache fetched products"),
    });
  }

  async fn cached_products(&self) -> BoxStream<'static, ProductsOutcome> {
    let dao = self.products_dao.clone();
    match tokio::task::spawn_blocking(move || dao.last_cached_at()).await {
      Ok(Ok(Some(cached_at))) => info!(%cached_at, "Offline, serving cached catalog"),
      Ok(Ok(None)) => info!("Offline and no catalog cached yet"),
      Ok(Err(e)) => debug!(error = %e, "Could not read cache age"),
      Err(e) => debug!(error = %e, "Cache age lookup was cancelled"),
    }

    self
      .products_dao
      .cache_products()
      .map(|products| {
        debug!("Loaded {} products from cache.", products.len());
        NetworkResult::Success(products)
      })
      .boxed()
  }
}

impl ProductsRepository for ProductsRepositoryImpl {
  fn fetch_products(&self) -> BoxStream<'static, ProductsOutcome> {
    let repo = self.clone();

    let outcome = async move {
      // Evaluated once per fetch
      if !repo.network.is_network_available().await {
        return repo.cached_products().await;
      }

      let result = safe_api_call(|| repo.api.fetch_products_list())
        .await
        .map(|dtos| dtos.into_iter().map(Product::from).collect::<Vec<_>>());

      if let NetworkResult::Success(products) = &result {
        info!("API call successful. Received {} products.", products.len());
        repo.persist_in_background(products.clone());
      }

      stream::once(ready(result)).boxed()
    };

    stream::once(ready(NetworkResult::Loading))
      .chain(stream::once(outcome).flatten())
      .boxed()
  }

  fn save_products(&self, products: &[Product]) -> Result<()> {
    self.products_dao.insert(products)
  }
}
