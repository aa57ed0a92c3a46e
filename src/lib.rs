//! Plan appliance runs on Swedish day-ahead electricity spot prices.
//!
//! Prices for today and tomorrow are fetched from the public `mgrey.se` feed,
//! the cheapest contiguous block of hours is selected and the result is
//! served as a small web dashboard.

pub mod chart;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod plan;
pub mod price;
pub mod window;

pub use client::{query_prices, FeedConfig, PriceFeed, Zone};
pub use config::AppConfig;
pub use error::EspotError;
pub use plan::{plan, EndDay, Plan, PlanRequest};
pub use price::{PricePoint, PriceSeries};
pub use window::{select_best_window, Window, WindowSelection};
