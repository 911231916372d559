// Chat state, unlock gate, and the event loop that ties them to the gateway.

pub mod app;
pub mod auth;
pub mod chat;
pub mod lifecycle;
pub mod protocol;

#[cfg(test)]
pub(crate) mod testing;
