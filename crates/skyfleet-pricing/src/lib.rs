//! Price selection and capacity probing
//!
//! [`PriceOptimizer`] picks the cheapest `(region, instance type)` pair
//! from live quotes; [`CapacityProbe`] narrows a region list to the regions
//! that currently sell spot capacity. Both are read-only and share the
//! bounded fan-out pool from `skyfleet-cloud`.

pub mod cache;
pub mod capacity;
pub mod catalog;
pub mod currency;
pub mod error;
pub mod optimizer;
pub mod router;

pub use cache::{DEFAULT_QUOTE_TTL, QuoteCache};
pub use capacity::{CapacityProbe, prune};
pub use catalog::{CatalogEntry, CatalogPriceClient};
pub use currency::ConversionTable;
pub use error::{OptimizeError, Result};
pub use optimizer::{Candidate, PriceOptimizer, PriceTarget};
pub use router::QuoteRouter;
