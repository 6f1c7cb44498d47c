//! Repositories the UI and CLI talk to.

pub mod auth;
pub mod cart;
pub mod products;
pub mod secure_storage;
pub mod types;

pub use auth::AuthRepository;
pub use cart::CartRepository;
pub use products::{ProductsOutcome, ProductsRepository, ProductsRepositoryImpl};
pub use secure_storage::SecureStorage;
