//! Message loop integration test modules

pub mod registry;
pub mod scenarios;
