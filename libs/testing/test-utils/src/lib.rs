//! Test fixtures shared by the domain crates
//!
//! - [`TestDatabase`] (feature `postgres`, default): a throwaway PostgreSQL
//!   container with every workspace migration applied
//! - [`TestRedis`] (feature `redis`): a throwaway Redis container
//! - [`TestDataBuilder`]: stable ids and emails derived from a test name
//!
//! Container-backed tests need Docker and are marked `#[ignore]`:
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestDatabase};
//!
//! #[tokio::test]
//! #[ignore = "requires docker"]
//! async fn test_votes_persist() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("test_votes_persist");
//!
//!     let voter = db.create_test_user(builder.nth_user_id(0)).await;
//!     let target = db.create_test_user(builder.nth_user_id(1)).await;
//! }
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "postgres")]
pub use postgres::{TEST_PASSWORD_HASH, TestDatabase};

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Deterministic fixture values.
///
/// Two builders with the same seed produce the same ids and emails, so a
/// failing test can be replayed exactly. Different test names keep
/// parallel tests on one database from colliding on unique columns.
#[derive(Debug, Clone, Copy)]
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from a hash of the test name.
    pub fn from_test_name(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn user_id(&self) -> Uuid {
        let half = self.seed.to_le_bytes();
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&half);
        bytes[8..].copy_from_slice(&half);
        Uuid::from_bytes(bytes)
    }

    /// The `index`-th user of a test; index 0 equals [`Self::user_id`].
    pub fn nth_user_id(&self, index: u64) -> Uuid {
        Self::new(self.seed.wrapping_add(index)).user_id()
    }

    /// `"{local}-{seed}@example.com"`
    pub fn email(&self, local: &str) -> String {
        format!("{}-{}@example.com", local, self.seed)
    }
}
