//! Agile tariff planning: rolling block forecasts and cheapest-window EV
//! charging schedules, published back to a host automation platform.

pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod host;
pub mod ingest;
pub mod optimizer;
pub mod telemetry;
