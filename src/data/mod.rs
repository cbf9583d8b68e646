//! Data handling
//!
//! - `series`: the `TimeSeries` value type
//! - `rolling`: summary and rolling statistics
//! - `loader`: CSV telemetry loading
//! - `synthetic`: seeded synthetic series for demos and tests

mod loader;
mod rolling;
mod series;
mod synthetic;

pub use loader::*;
pub use rolling::*;
pub use series::*;
pub use synthetic::*;
