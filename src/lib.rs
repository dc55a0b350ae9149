pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod discord;
pub mod error;
pub mod format;
pub mod keepalive;
pub mod logging;
pub mod metrics;
