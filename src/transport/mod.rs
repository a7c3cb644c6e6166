//! Transport module - the TCP socket to the server.
//!
//! Provides connection establishment and the read/write split the
//! receive loop and writer task work on.

mod tcp;

pub use tcp::{connect, ServerAddr, TcpReadHalf, TcpWriteHalf};
