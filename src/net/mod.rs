//! Host/client networking
//!
//! Wire messages, snapshot sync, and the transports that carry them.

pub mod framing;
pub mod loopback;
pub mod mailbox;
pub mod protocol;
pub mod sync;
pub mod transport;

#[cfg(feature = "tcp")]
pub mod tcp;
