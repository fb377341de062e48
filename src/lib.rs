//! Scrapes myICLUB member unit valuation ledgers: one login, thirteen
//! monthly report pages, one flat CSV.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod period;
pub mod record;
pub mod scrape;
