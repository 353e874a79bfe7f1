// Library exports for scribe
// The binary and the integration tests both build on these modules

pub mod config;
pub mod error;
pub mod extractors;
pub mod ids;
pub mod posts;
pub mod routes;
pub mod state;
pub mod uploads;
