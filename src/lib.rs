pub mod actors;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
