//! Terminal admin dashboard for sales agents and their customers

pub mod cli;
pub mod config;
pub mod export;
pub mod gateway;
pub mod logging;
pub mod query;
pub mod services;
pub mod session;
pub mod tui;
pub mod types;
