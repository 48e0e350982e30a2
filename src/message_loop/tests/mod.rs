//! Test modules for message loops
//!
//! Tests are organised by functional area; shared observers and helpers
//! live in `support`.
