pub mod clock;
pub mod error;
pub mod memory;
pub mod policy;
pub mod sqlite;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use policy::{CachePolicy, CacheStatus, TtlPolicy};
pub use sqlite::SqliteStore;
pub use store::{CacheStore, KeyValueStore, MemoryStore};
