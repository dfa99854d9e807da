//! The wire protocol between agents and the controller.
//!
//! Every message travels as one length-framed JSON object: a u32 big-endian
//! length prefix followed by the body. Every read, write, and connect carries
//! an explicit deadline; a slow or silent peer costs one bounded worker, not
//! a stalled task.

pub mod error;
pub mod protocol;
pub mod transport;

pub use error::NetError;
pub use protocol::{RegisterRequest, RegisterResponse};
pub use transport::{connect, recv_message, send_message, MAX_FRAME_LEN};
