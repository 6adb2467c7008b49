pub mod analysis;
pub mod cache;
pub mod config;
pub mod datasets;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod score;
pub mod table;
