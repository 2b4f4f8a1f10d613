//! Containers and fixtures for the domain crates' integration tests.
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestDatabase};
//!
//! # async fn example() {
//! let db = TestDatabase::new().await;
//! let builder = TestDataBuilder::from_test_name("creates_product");
//! let sku = builder.sku("TEE");
//! # }
//! ```

use std::hash::{DefaultHasher, Hash, Hasher};
use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;
#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Unique-per-test values for tables that outlive a single assertion.
/// Everything derives from one seed, so a failing run can be replayed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_test_name(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&bytes);
        id[8..].copy_from_slice(&bytes);
        Uuid::from_bytes(id)
    }

    /// Valid address on the `shop.test` domain
    pub fn email(&self, local: &str) -> String {
        format!("{}.{}@shop.test", local, self.seed % 1_000_000)
    }

    /// Uppercase SKU such as `TEE-004211`
    pub fn sku(&self, prefix: &str) -> String {
        format!("{}-{:06}", prefix.to_uppercase(), self.seed % 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_data() {
        let a = TestDataBuilder::from_test_name("orders_pg_round_trip");
        let b = TestDataBuilder::from_test_name("orders_pg_round_trip");
        assert_eq!(a.user_id(), b.user_id());
        assert_eq!(a.sku("mug"), b.sku("mug"));
    }

    #[test]
    fn test_different_names_differ() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");
        assert_ne!(a.user_id(), b.user_id());
    }

    #[test]
    fn test_email_and_sku_are_well_formed() {
        let builder = TestDataBuilder::new(1_234_567);
        assert_eq!(builder.email("buyer"), "buyer.234567@shop.test");
        assert_eq!(builder.sku("tee"), "TEE-234567");
    }
}
