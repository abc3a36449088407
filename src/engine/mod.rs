pub mod command;
pub mod log;
pub mod models;
pub mod roll;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod simulation;
pub mod tiles;
