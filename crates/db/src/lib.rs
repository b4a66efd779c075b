mod error;
mod loader;
mod pool;
mod schema;
mod strategy;
mod transaction;

pub use error::DbError;
pub use loader::{LoadResult, Loader};
pub use pool::{ConnectionPool, PoolStats};
pub use schema::SchemaManager;
pub use strategy::{BulkStrategy, IndividualStrategy, InsertCounts, InsertionStrategy};
pub use transaction::TransactionManager;
