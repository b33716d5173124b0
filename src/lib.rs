//! Build priced resource trees for cloud infrastructure and roll them up
//! into hourly and monthly cost estimates.

pub mod aggregate;
pub mod cost;
pub mod error;
pub mod estimate;
pub mod pricing;
pub mod reservation;
pub mod resources;
pub mod schema;
pub mod tiers;

pub use error::{Error, Result};
