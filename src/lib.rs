// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod models;
pub mod routes;
pub mod telemetry;
pub mod worker;
