// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod cache;
pub mod distance;
pub mod finder;
pub mod place_service;
pub mod rate_limit;
pub mod summary;

pub use cache::*;
pub use finder::*;
pub use place_service::*;
pub use rate_limit::*;
