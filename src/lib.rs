pub mod capsule;
pub mod carrier;
pub mod error;
pub mod frame;
pub mod session;
pub mod stream;
pub mod varint;
pub mod visitor;

#[cfg(test)]
pub(crate) mod testutil;

pub use capsule::CloseCapsule;
pub use carrier::{Carrier, DatagramFormat, DatagramStatus};
pub use error::{Error, Result, SessionErrorCode, StreamErrorCode};
pub use session::{Session, SessionId};
pub use stream::{StreamVisitor, UnidirectionalStream};
pub use visitor::{NoopVisitor, SessionVisitor};
