//! Adapters implementing the domain ports.

pub mod memory;
pub mod oracle;
pub mod sqlite;

pub use memory::InMemoryProgressStore;
pub use oracle::{HttpOracle, MockOracle};
pub use sqlite::SqliteProgressStore;
