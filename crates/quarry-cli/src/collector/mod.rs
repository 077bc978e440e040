pub mod commands;
pub mod config;
pub mod fetch;
pub mod runner;
pub mod store;
pub mod telemetry;
pub mod validate;
pub mod windows;
