//! Set valuations from a BrickEconomy-compatible price service.
//!
//! [`HttpPriceClient`] looks up the market value of a set; [`refresh_prices`]
//! feeds the current new and used values into the reference store's
//! `update_prices` write path.

mod client;
mod types;

pub use client::{
    DEFAULT_CURRENCY, DEFAULT_PRICE_BASE_URL, HttpPriceClient, HttpPriceClientConfig,
    PriceLookupError, PriceRefresh, refresh_prices,
};
pub use types::{PriceEvent, SetValuation};
