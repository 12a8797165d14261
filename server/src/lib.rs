pub mod config;
pub mod llm;
pub mod ops;
pub mod places;
pub mod server;
