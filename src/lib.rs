// Public API for integration tests and embedding in a chat bot

pub mod config;
pub mod delivery;
pub mod error;
pub mod render;
pub mod state;
pub mod streak;
pub mod types;
pub mod workers;
