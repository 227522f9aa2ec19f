//! Watchlist Core: domain types, screening criterion, market data.
//!
//! This crate contains everything a single screen decision depends on:
//! - Domain types (symbols, price series, lookback periods)
//! - The "doubled off a recent low" criterion evaluator
//! - The `SeriesProvider` trait with Yahoo Finance and in-memory implementations
//! - Circuit breaker shared by concurrent fetches
//! - Universe loading from CSV files or URLs

pub mod criterion;
pub mod data;
pub mod domain;

pub use criterion::{evaluate, price_extremes, PriceExtremes};
pub use data::{FetchError, SeriesProvider};
pub use domain::{LookbackPeriod, PricePoint, PriceSeries, Symbol};
