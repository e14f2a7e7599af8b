pub mod error;
pub mod feed;
pub mod memory;
pub mod rates;
pub mod repo;
pub mod streak;
pub mod tracker;

pub use error::{Error, Result};
pub use memory::MemoryRepo;
pub use repo::Repository;
pub use tracker::HabitTracker;
