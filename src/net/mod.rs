//! Transport: line framing over non-blocking TCP, multiplexed with a poll
//! loop.

pub mod connection;
pub mod ring;
pub mod server;
