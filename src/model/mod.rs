pub mod process;
pub mod socket;

pub use process::{ProcessSnapshot, SnapshotFields};
pub use socket::{Protocol, SocketRecord, ANY_ADDRESS};
