//! Core services and infrastructure

pub mod error_handling;
pub mod logging;
pub mod sync;
pub mod time;
pub mod version;
