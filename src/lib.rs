pub mod board;
pub mod config;
pub mod messages;
pub mod runtime;
