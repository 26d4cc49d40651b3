pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod geocode;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod scraping;
pub mod utils;
