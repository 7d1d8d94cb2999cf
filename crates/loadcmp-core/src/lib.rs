pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod results;
pub mod stats;
pub mod summary;
pub mod telemetry;

pub use error::LoadcmpError;
