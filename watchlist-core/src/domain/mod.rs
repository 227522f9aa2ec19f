//! Domain types: symbols, price series, lookback periods.

pub mod period;
pub mod series;
pub mod symbol;

pub use period::{LookbackPeriod, UnknownPeriod};
pub use series::{PricePoint, PriceSeries};
pub use symbol::Symbol;
