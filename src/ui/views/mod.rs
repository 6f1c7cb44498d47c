mod cart;
mod products;

pub use cart::CartView;
pub use products::ProductsView;
