pub mod checks;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod reporting;
