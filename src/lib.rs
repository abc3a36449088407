pub mod dictionary;
pub mod engine;
pub mod export;
pub mod server;
