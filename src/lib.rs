pub mod app;
pub mod core;
pub mod message_loop;
