// Library crate exposing modules for the binary and integration tests

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod repository;
pub mod util;
