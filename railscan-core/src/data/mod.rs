//! Series ingestion seam.

pub mod provider;

pub use provider::{DataError, DataSource, InMemoryProvider, LoadedSeries, PriceSeriesProvider};
