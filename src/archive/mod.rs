pub mod config;
pub mod index;
pub mod membership;
pub mod paths;
pub mod reader;
pub mod record;
pub mod resources;
pub mod store;
pub mod tables;
pub mod threads;
pub mod timeframe;
pub mod warn;
