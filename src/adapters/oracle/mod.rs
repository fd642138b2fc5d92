//! Oracle adapters.

pub mod http;
pub mod mock;

pub use http::HttpOracle;
pub use mock::{MockCalls, MockOracle};
