//! Market data: series providers, the shared circuit breaker, universe loading.

pub mod circuit_breaker;
pub mod memory;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use memory::InMemoryProvider;
pub use provider::{FetchError, SeriesProvider};
pub use universe::{Universe, UniverseError, ASX_CODE_COLUMN};
pub use yahoo::YahooProvider;
