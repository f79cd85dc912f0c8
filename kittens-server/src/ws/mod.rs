//! WebSocket module for subscriber streams

mod connection;
mod protocol;

pub use connection::subscriber_ws;
pub use protocol::ServerMessage;
