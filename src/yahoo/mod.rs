pub mod auth;
pub mod client;
pub mod quote_summary;

pub use client::YahooClient;
