// Core types shared by every companion crate: the chat message model, the
// secure key-value store, the credential cache built on top of it, and the
// TOML configuration.

pub mod config;
pub mod credentials;
pub mod message;
pub mod store;
