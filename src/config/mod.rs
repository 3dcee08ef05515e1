// src/config/mod.rs
// DOCUMENTATION: Configuration module organization
// PURPOSE: Re-export configuration components

pub mod db;
pub mod env;

pub use db::{ensure_schema, init_db_pool};
pub use env::{Config, StoreBackend};
