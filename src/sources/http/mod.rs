//! JSON search API provider.
//!
//! Any service answering `GET {base_url}/search?title=..&artist=..` with a
//! `{"results": [...]}` body can be configured as a provider.

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_raw_charts;
pub use client::HttpChartSource;
