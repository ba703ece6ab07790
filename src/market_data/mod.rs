pub mod bar;
pub mod profile;
pub mod source;
pub mod ttl_cache;

// Re-export the data types for convenient access (e.g. `use crate::market_data::Bar`).
pub use bar::{Bar, ChartData, ChartKey, ChartMeta};
pub use profile::CompanyProfile;
pub use source::{ChartFuture, ChartSource, ProfileFuture};
pub use ttl_cache::{ChartCache, ProfileCache};
