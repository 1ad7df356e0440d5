pub mod config;
pub mod roster;
pub mod title;
pub mod types;
