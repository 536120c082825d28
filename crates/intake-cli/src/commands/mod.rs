//! CLI command handlers

pub mod config;
pub mod countries;
pub mod push;
