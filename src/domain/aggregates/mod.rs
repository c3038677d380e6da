//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, CartPersistence, CartProduct, CartStore, JsonFilePersistence, NoPersistence};
pub use order::{CustomerDetails, Order, OrderError, OrderItem, OrderStatus, OrderTotals, StatusHistoryEntry};
pub use product::{Category, Product, ProductError, ProductImage, ProductOption, ProductVariant};
